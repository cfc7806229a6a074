//! Profile catalog persistence

use presence_api::Profile;
use presence_util::ProfileId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{StoreError, StoreResult};

const PROFILES_FILENAME: &str = "profiles.json";

/// Loads and saves the profile catalog as a JSON array.
///
/// A missing file is an empty catalog, not an error; a corrupt file is an
/// error so a typo during hand-editing never silently wipes profiles.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PROFILES_FILENAME),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all profiles.
    ///
    /// Rejects catalogs with duplicate ids: the id is the user-facing name
    /// and every lookup assumes it is unique.
    pub fn load(&self) -> StoreResult<Vec<Profile>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No profile file, starting empty");
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let profiles: Vec<Profile> = serde_json::from_str(&raw)?;

        let mut seen = HashSet::new();
        for profile in &profiles {
            if !seen.insert(profile.id.clone()) {
                return Err(StoreError::DuplicateProfile(profile.id.clone()));
            }
        }

        info!(
            count = profiles.len(),
            path = %self.path.display(),
            "Profiles loaded"
        );
        Ok(profiles)
    }

    /// Save the whole catalog, enforcing id uniqueness
    pub fn save(&self, profiles: &[Profile]) -> StoreResult<()> {
        let mut seen = HashSet::new();
        for profile in profiles {
            if !seen.insert(&profile.id) {
                return Err(StoreError::DuplicateProfile(profile.id.clone()));
            }
        }

        let raw = serde_json::to_string_pretty(profiles)?;
        crate::write_atomic(&self.path, raw.as_bytes())?;
        debug!(count = profiles.len(), "Profiles saved");
        Ok(())
    }
}

/// Find a profile by id in a loaded catalog
pub fn find_profile<'a>(profiles: &'a [Profile], id: &ProfileId) -> Option<&'a Profile> {
    profiles.iter().find(|p| &p.id == id)
}
