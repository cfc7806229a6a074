//! Run-at-startup registration via XDG autostart
//!
//! The desktop session launches everything in `~/.config/autostart` at
//! login, so registering is writing a .desktop entry and unregistering is
//! deleting it.

use std::path::Path;
use tracing::info;

use crate::StoreResult;

const DESKTOP_FILENAME: &str = "presenced.desktop";

fn desktop_entry(exec: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=presenced\n\
         Comment=Presence watchdog daemon\n\
         Exec={}\n\
         X-GNOME-Autostart-enabled=true\n",
        exec.display()
    )
}

/// Register or unregister the daemon for launch at login.
///
/// `exec` is the daemon binary to launch; both operations are idempotent.
pub fn set_run_at_startup(enabled: bool, exec: &Path) -> StoreResult<()> {
    set_run_at_startup_in(&presence_util::autostart_dir(), enabled, exec)
}

/// Same as [`set_run_at_startup`] against an explicit autostart directory
pub fn set_run_at_startup_in(dir: &Path, enabled: bool, exec: &Path) -> StoreResult<()> {
    let path = dir.join(DESKTOP_FILENAME);

    if enabled {
        crate::write_atomic(&path, desktop_entry(exec).as_bytes())?;
        info!(path = %path.display(), "Autostart entry registered");
    } else if path.exists() {
        std::fs::remove_file(&path)?;
        info!(path = %path.display(), "Autostart entry removed");
    }

    Ok(())
}
