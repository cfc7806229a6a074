//! Target process detection via /proc

use presence_host_api::{ProbeError, ProcessProbe};
use std::path::{Path, PathBuf};
use tracing::trace;

/// The kernel truncates `/proc/<pid>/comm` to 15 bytes plus newline
const TASK_COMM_LEN: usize = 15;

/// Detects whether a target executable is running by scanning `/proc`.
///
/// The comparison uses the executable's base name without extension,
/// case-insensitively, so a profile written with `Game.exe` still matches
/// a native `game` process.
pub struct LinuxProcessProbe {
    proc_root: PathBuf,
}

impl LinuxProcessProbe {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Probe against an alternate proc root. Test hook.
    pub fn with_proc_root(proc_root: PathBuf) -> Self {
        Self { proc_root }
    }
}

impl Default for LinuxProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for LinuxProcessProbe {
    fn is_running(&self, exe_path: &Path) -> Result<bool, ProbeError> {
        // A profile without a target is not gated on any process
        if exe_path.as_os_str().is_empty() {
            return Ok(true);
        }

        let target = match presence_api::exe_stem(exe_path) {
            Some(stem) => stem.to_lowercase(),
            None => return Ok(false),
        };
        // comm is truncated, so a long target only matches on its prefix
        let target_comm: String = target.chars().take(TASK_COMM_LEN).collect();

        let entries = std::fs::read_dir(&self.proc_root)
            .map_err(|e| ProbeError::Enumeration(format!("reading {}: {}", self.proc_root.display(), e)))?;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }

            // Processes exit mid-scan; unreadable entries are skipped
            let comm = match std::fs::read_to_string(entry.path().join("comm")) {
                Ok(comm) => comm,
                Err(_) => continue,
            };

            if comm.trim_end().to_lowercase() == target_comm {
                trace!(pid = name, target = %target, "Target process found");
                return Ok(true);
            }
        }

        Ok(false)
    }
}
