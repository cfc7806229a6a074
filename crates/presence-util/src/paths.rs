//! Default paths for presenced components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/presenced/presenced.sock` or `/tmp/presenced-$USER/presenced.sock`
//! - Data: `$XDG_DATA_HOME/presenced` or `~/.local/share/presenced`
//!
//! Overrides via `PRESENCED_SOCKET` / `PRESENCED_DATA_DIR` are handled by
//! the binaries' argument parsing; these functions only compute the
//! XDG-derived fallbacks.

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const PRESENCED_SOCKET_ENV: &str = "PRESENCED_SOCKET";

/// Environment variable for overriding the data directory
pub const PRESENCED_DATA_DIR_ENV: &str = "PRESENCED_DATA_DIR";

const SOCKET_FILENAME: &str = "presenced.sock";

const APP_DIR: &str = "presenced";

/// Default socket path: `$XDG_RUNTIME_DIR/presenced/presenced.sock`,
/// falling back to `/tmp/presenced-$USER/presenced.sock`.
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Default data directory (profiles.json, app_settings.json):
/// `$XDG_DATA_HOME/presenced`, falling back to `~/.local/share/presenced`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the XDG autostart directory for run-at-startup registration.
pub fn autostart_dir() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join("autostart");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("autostart");
    }

    PathBuf::from("/tmp").join(APP_DIR).join("autostart")
}
