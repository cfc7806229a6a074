//! Boundary traits
//!
//! Both traits are synchronous: the controller calls them from its tick
//! handler, serialized on one scheduling context. Implementations must
//! return promptly; transports with blocking I/O carry bounded timeouts
//! internally.

use presence_api::PresencePayload;
use std::path::Path;
use thiserror::Error;

use crate::ConnectionHandle;

/// Errors from the companion session client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors from process enumeration
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Process enumeration failed: {0}")]
    Enumeration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session-establishment client to the external companion process.
///
/// The wire protocol behind this is not the core's business; a handle is
/// only valid with the client that created it.
pub trait PresenceClient: Send + Sync {
    /// Open a connection for the given application id
    fn connect(&self, application_id: &str) -> ClientResult<ConnectionHandle>;

    /// Publish presence data on an open connection.
    /// Re-publishing unchanged data resets the companion's expiry clock.
    fn publish(&self, handle: &ConnectionHandle, payload: &PresencePayload) -> ClientResult<()>;

    /// Close a connection. Consumes the handle; always succeeds.
    fn close(&self, handle: ConnectionHandle);
}

/// Answers "is executable X currently running?".
///
/// An empty path is always running (profiles without a target always
/// publish). Callers treat `Err` as "not running": pausing presence beats
/// erroring out.
pub trait ProcessProbe: Send + Sync {
    fn is_running(&self, exe_path: &Path) -> Result<bool, ProbeError>;
}
