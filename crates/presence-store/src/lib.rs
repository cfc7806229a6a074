//! Persistence layer for presenced
//!
//! Provides:
//! - Profile catalog (profiles.json)
//! - Application settings (app_settings.json)
//! - Run-at-startup registration (XDG autostart entry)
//!
//! Everything is plain JSON on disk, written atomically (temp file plus
//! rename) so a crash mid-write never corrupts the previous contents.

mod autostart;
mod profiles;
mod settings;

pub use autostart::*;
pub use profiles::*;
pub use settings::*;

use presence_util::ProfileId;
use std::path::Path;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate profile id: {0}")]
    DuplicateProfile(ProfileId),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Write `bytes` to `path` via a temp file in the same directory, then
/// rename over the destination. Rename is atomic within one filesystem.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = path.parent().ok_or_else(|| {
        StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;
    std::fs::create_dir_all(dir)?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
