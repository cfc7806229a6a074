//! Application settings persistence

use presence_util::ProfileId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::StoreResult;

const SETTINGS_FILENAME: &str = "app_settings.json";

fn default_poll_interval() -> u32 {
    5
}

/// Daemon settings, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppSettings {
    /// Register an XDG autostart entry for the daemon
    pub run_at_startup: bool,

    /// Start the last-used profile automatically on daemon startup
    pub auto_start: bool,

    /// The profile most recently started
    pub last_profile_id: Option<ProfileId>,

    /// Seconds between target probes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            run_at_startup: false,
            auto_start: false,
            last_profile_id: None,
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

/// Loads and saves [`AppSettings`] as a single JSON object.
///
/// Unlike profiles, settings degrade gracefully: a missing or corrupt file
/// yields defaults, since losing settings costs the user two checkboxes
/// rather than their whole catalog.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILENAME),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults
    pub fn load(&self) -> AppSettings {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                return AppSettings::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read settings, using defaults");
                return AppSettings::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt settings file, using defaults");
                AppSettings::default()
            }
        }
    }

    /// Save settings atomically
    pub fn save(&self, settings: &AppSettings) -> StoreResult<()> {
        let raw = serde_json::to_string_pretty(settings)?;
        crate::write_atomic(&self.path, raw.as_bytes())?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());

        let settings = store.load();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.poll_interval_seconds, 5);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(store.path(), "][").unwrap();

        assert_eq!(store.load(), AppSettings::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());

        let settings = AppSettings {
            run_at_startup: true,
            auto_start: true,
            last_profile_id: Some(ProfileId::new("coding")),
            poll_interval_seconds: 10,
        };
        store.save(&settings).unwrap();

        assert_eq!(store.load(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(store.path(), r#"{"auto_start": true}"#).unwrap();

        let settings = store.load();
        assert!(settings.auto_start);
        assert_eq!(settings.poll_interval_seconds, 5);
        assert_eq!(settings.last_profile_id, None);
    }
}
