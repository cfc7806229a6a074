//! Shared types for the presenced API

use chrono::{DateTime, Utc};
use presence_util::ProfileId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unit for a relative timestamp offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl OffsetUnit {
    /// Seconds per unit
    pub fn multiplier(&self) -> u64 {
        match self {
            OffsetUnit::Seconds => 1,
            OffsetUnit::Minutes => 60,
            OffsetUnit::Hours => 3600,
            OffsetUnit::Days => 86400,
        }
    }
}

/// Timestamp configuration for a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimestampConfig {
    /// No start instant; the companion shows no elapsed timer
    #[default]
    None,

    /// Claim a start instant `magnitude * unit` in the past
    RelativeOffset { magnitude: u64, unit: OffsetUnit },
}

/// A user-defined presence profile.
///
/// Immutable snapshot during a session: edits in the shell produce a new
/// record, never mutate a running one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name within the profile collection
    pub id: ProfileId,

    /// External application id used to connect to the companion process
    pub application_id: String,

    /// First display line
    #[serde(default)]
    pub details: String,

    /// Second display line
    #[serde(default)]
    pub state: String,

    /// Image reference keys (opaque to the core)
    #[serde(default)]
    pub large_image_key: Option<String>,

    #[serde(default)]
    pub small_image_key: Option<String>,

    /// Executable whose presence gates the session.
    /// Empty means "always considered running".
    #[serde(default)]
    pub target_exe: PathBuf,

    #[serde(default)]
    pub timestamp: TimestampConfig,
}

impl Profile {
    /// Whether this profile watches a target executable at all
    pub fn has_target(&self) -> bool {
        !self.target_exe.as_os_str().is_empty()
    }

    /// Display label for the watched target: the executable's base name
    /// without extension, or "target" for gate-less profiles.
    pub fn target_label(&self) -> String {
        exe_stem(&self.target_exe).unwrap_or_else(|| "target".to_string())
    }
}

/// Base name of an executable path, without directory or extension.
///
/// Splits on both separators, so profiles carrying foreign-style paths
/// like `C:\Games\Game.exe` still yield `Game`.
pub fn exe_stem(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy();
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(&raw);
    let stem = match base.rsplit_once('.') {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => base,
    };
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// The presence data published to the companion process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresencePayload {
    pub details: String,
    pub state: String,
    pub large_image_key: Option<String>,
    pub small_image_key: Option<String>,
    /// Claimed start instant; None means no elapsed timer
    pub start: Option<DateTime<Utc>>,
}

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    /// No active profile
    Idle,
    /// Active profile set, target not confirmed running
    Scanning,
    /// Target confirmed running, session published
    Attached,
}

/// Active session information for clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub profile_id: ProfileId,
    pub target: String,
    pub attached: bool,
    /// Seconds until the next probe
    pub countdown: u32,
}

/// Full daemon state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStateSnapshot {
    pub api_version: u32,
    pub phase: ControllerPhase,
    pub session: Option<SessionInfo>,
    pub profile_count: usize,
    pub poll_interval_seconds: u32,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub profiles_loaded: bool,
    pub store_ok: bool,
}
