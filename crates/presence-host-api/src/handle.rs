//! Connection handle abstraction

use serde::{Deserialize, Serialize};

/// Opaque handle to one open connection to the companion process
///
/// Created by a [`crate::PresenceClient`] on `connect`; the transport
/// payload is opaque to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionHandle {
    /// Application id the connection was opened with
    pub application_id: String,

    /// Transport-specific payload (opaque to core)
    payload: HandlePayload,
}

impl ConnectionHandle {
    pub fn new(application_id: impl Into<String>, payload: HandlePayload) -> Self {
        Self {
            application_id: application_id.into(),
            payload,
        }
    }

    pub fn payload(&self) -> &HandlePayload {
        &self.payload
    }
}

/// Transport-specific handle payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum HandlePayload {
    /// Unix domain socket connection, keyed by the client's connection table
    Unix { conn_id: u64 },

    /// Mock for testing
    Mock { id: u64 },
}
