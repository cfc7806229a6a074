//! Event types for presenced -> client streaming

use chrono::{DateTime, Local};
use presence_util::ProfileId;
use serde::{Deserialize, Serialize};

use crate::{DaemonStateSnapshot, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: presence_util::now_local(),
            payload,
        }
    }
}

/// All possible events from the service to clients.
///
/// Status, toast, and countdown events are fire-and-forget: shells render
/// them (status bar, pop-up, tray tooltip) and never acknowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full state snapshot (sent on subscribe and major changes)
    StateChanged(DaemonStateSnapshot),

    /// Human-readable status line changed
    StatusChanged { text: String },

    /// A toast pop-up should be shown
    ToastRequested { text: String },

    /// Seconds remaining until the next probe (emitted every watchdog tick)
    CountdownTick { seconds_remaining: u32 },

    /// Target confirmed running, presence published
    SessionAttached { profile_id: ProfileId, target: String },

    /// Target gone, presence withdrawn (still scanning)
    SessionDetached { profile_id: ProfileId },

    /// profiles.json was re-read
    ProfilesReloaded { profile_count: usize },

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::SessionAttached {
            profile_id: ProfileId::new("coding"),
            target: "code".into(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(parsed.payload, EventPayload::SessionAttached { .. }));
    }

    #[test]
    fn countdown_event_serialization() {
        let event = Event::new(EventPayload::CountdownTick { seconds_remaining: 4 });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("countdown_tick"));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        if let EventPayload::CountdownTick { seconds_remaining } = parsed.payload {
            assert_eq!(seconds_remaining, 4);
        } else {
            panic!("Expected CountdownTick");
        }
    }
}
