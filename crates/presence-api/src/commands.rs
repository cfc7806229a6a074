//! Command types for the presenced protocol

use presence_util::{ClientId, ProfileId};
use serde::{Deserialize, Serialize};

use crate::{DaemonStateSnapshot, HealthStatus, Profile, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    ProfileNotFound,
    MissingApplicationId,
    NoActiveSession,
    InvalidInterval,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get current daemon state
    GetState,

    /// List all known profiles, in stored order
    ListProfiles,

    /// Start broadcasting a profile (implicit stop of any current session)
    Start { profile_id: ProfileId },

    /// Stop the current session
    Stop,

    /// Set the watchdog poll interval (seconds, >= 1)
    SetPollInterval { seconds: u32 },

    /// Re-read profiles.json from disk
    ReloadProfiles,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Register or withdraw the daemon's autostart entry
    SetRunAtStartup { enabled: bool },

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(DaemonStateSnapshot),
    Profiles(Vec<Profile>),
    Started { profile_id: ProfileId },
    Stopped,
    IntervalSet { seconds: u32 },
    ProfilesReloaded { profile_count: usize },
    Subscribed { client_id: ClientId },
    Unsubscribed,
    RunAtStartupSet { enabled: bool },
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by the IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    /// Unix UID if available (logging only)
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new() -> Self {
        Self {
            client_id: ClientId::new(),
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ControllerPhase;

    #[test]
    fn request_serialization() {
        let req = Request::new(1, Command::GetState);
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert!(matches!(parsed.command, Command::GetState));
    }

    #[test]
    fn start_command_serialization() {
        let req = Request::new(2, Command::Start {
            profile_id: ProfileId::new("coding"),
        });
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("start"));
        assert!(json.contains("coding"));
    }

    #[test]
    fn response_serialization() {
        let resp = Response::success(
            1,
            ResponsePayload::State(DaemonStateSnapshot {
                api_version: API_VERSION,
                phase: ControllerPhase::Idle,
                session: None,
                profile_count: 3,
                poll_interval_seconds: 5,
            }),
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
    }

    #[test]
    fn run_at_startup_round_trip() {
        let req = Request::new(3, Command::SetRunAtStartup { enabled: true });
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_run_at_startup"));

        let resp = Response::success(3, ResponsePayload::RunAtStartupSet { enabled: true });
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::RunAtStartupSet { enabled: true })
        ));
    }

    #[test]
    fn error_response() {
        let resp = Response::error(
            7,
            ErrorInfo::new(ErrorCode::ProfileNotFound, "No such profile"),
        );

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("profile_not_found"));
    }
}
