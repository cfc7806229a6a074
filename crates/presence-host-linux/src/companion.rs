//! Presence transport over the companion's Unix socket
//!
//! The companion process listens on a Unix socket and accepts
//! newline-delimited JSON frames: a handshake naming the application id,
//! activity frames carrying the presence payload, and a close frame. One
//! socket connection per session; re-publishing on the same connection
//! replaces the previous activity.

use presence_api::PresencePayload;
use presence_host_api::{
    ClientError, ClientResult, ConnectionHandle, HandlePayload, PresenceClient,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable overriding the companion socket path
pub const COMPANION_SOCKET_ENV: &str = "PRESENCED_COMPANION_SOCKET";

const SOCKET_BASENAME: &str = "companion-ipc";

/// Publishes are best-effort; a wedged companion must not stall the
/// daemon's tick loop
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WireFrame<'a> {
    Handshake {
        v: u32,
        application_id: &'a str,
    },
    Activity {
        details: &'a str,
        state: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        large_image_key: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        small_image_key: Option<&'a str>,
        /// Unix seconds, omitted when no elapsed timer is wanted
        #[serde(skip_serializing_if = "Option::is_none")]
        start: Option<i64>,
    },
    Close,
}

/// [`PresenceClient`] over the companion's Unix socket.
///
/// Holds an internal connection table so the handles passed back to the
/// core stay plain data.
pub struct CompanionSocketClient {
    socket_path: Option<PathBuf>,
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, UnixStream>>,
}

impl CompanionSocketClient {
    /// Client using the discovered default socket
    pub fn new() -> Self {
        Self {
            socket_path: None,
            next_id: AtomicU64::new(1),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Client pinned to an explicit socket path
    pub fn with_socket_path(path: PathBuf) -> Self {
        Self {
            socket_path: Some(path),
            next_id: AtomicU64::new(1),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the socket to connect to.
    ///
    /// Order: explicit path, `$PRESENCED_COMPANION_SOCKET`, then
    /// `companion-ipc-{0..9}` under `$XDG_RUNTIME_DIR` (or `/tmp`), first
    /// one that exists.
    fn resolve_socket(&self) -> ClientResult<PathBuf> {
        if let Some(path) = &self.socket_path {
            return Ok(path.clone());
        }

        if let Ok(path) = std::env::var(COMPANION_SOCKET_ENV) {
            return Ok(PathBuf::from(path));
        }

        let base = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
        for n in 0..10 {
            let candidate = Path::new(&base).join(format!("{}-{}", SOCKET_BASENAME, n));
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        Err(ClientError::ConnectFailed(format!(
            "no companion socket found under {}",
            base
        )))
    }

    fn send_frame(stream: &mut UnixStream, frame: &WireFrame<'_>) -> ClientResult<()> {
        let mut line = serde_json::to_string(frame)
            .map_err(|e| ClientError::Internal(e.to_string()))?;
        line.push('\n');
        stream.write_all(line.as_bytes())?;
        Ok(())
    }

    fn conn_id(handle: &ConnectionHandle) -> ClientResult<u64> {
        match handle.payload() {
            HandlePayload::Unix { conn_id } => Ok(*conn_id),
            other => Err(ClientError::Internal(format!(
                "handle from a different transport: {:?}",
                other
            ))),
        }
    }
}

impl Default for CompanionSocketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceClient for CompanionSocketClient {
    fn connect(&self, application_id: &str) -> ClientResult<ConnectionHandle> {
        let socket = self.resolve_socket()?;

        let mut stream = UnixStream::connect(&socket).map_err(|e| {
            ClientError::ConnectFailed(format!("{}: {}", socket.display(), e))
        })?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

        Self::send_frame(
            &mut stream,
            &WireFrame::Handshake {
                v: 1,
                application_id,
            },
        )?;

        let conn_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match self.connections.lock() {
            Ok(mut table) => {
                table.insert(conn_id, stream);
            }
            Err(e) => {
                return Err(ClientError::Internal(format!(
                    "connection table poisoned: {}",
                    e
                )))
            }
        }

        debug!(conn_id, socket = %socket.display(), "Companion connection opened");
        Ok(ConnectionHandle::new(
            application_id,
            HandlePayload::Unix { conn_id },
        ))
    }

    fn publish(&self, handle: &ConnectionHandle, payload: &PresencePayload) -> ClientResult<()> {
        let conn_id = Self::conn_id(handle)?;
        let mut table = self
            .connections
            .lock()
            .map_err(|e| ClientError::Internal(format!("connection table poisoned: {}", e)))?;
        let stream = table.get_mut(&conn_id).ok_or(ClientError::NotConnected)?;

        let frame = WireFrame::Activity {
            details: &payload.details,
            state: &payload.state,
            large_image_key: payload.large_image_key.as_deref(),
            small_image_key: payload.small_image_key.as_deref(),
            start: payload.start.map(|t| t.timestamp()),
        };

        Self::send_frame(stream, &frame)
            .map_err(|e| ClientError::PublishFailed(e.to_string()))
    }

    fn close(&self, handle: ConnectionHandle) {
        let Ok(conn_id) = Self::conn_id(&handle) else {
            return;
        };

        let stream = match self.connections.lock() {
            Ok(mut table) => table.remove(&conn_id),
            Err(_) => None,
        };

        if let Some(mut stream) = stream {
            // Best effort: the companion drops the presence on disconnect
            // regardless
            if let Err(e) = Self::send_frame(&mut stream, &WireFrame::Close) {
                warn!(conn_id, error = %e, "Close frame not delivered");
            }
            let _ = stream.shutdown(std::net::Shutdown::Both);
            debug!(conn_id, "Companion connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::{BufRead, BufReader};
    use std::os::unix::net::UnixListener;
    use tempfile::TempDir;

    struct FakeCompanion {
        dir: TempDir,
        handle: std::thread::JoinHandle<Vec<String>>,
    }

    impl FakeCompanion {
        fn spawn() -> Self {
            let dir = TempDir::new().unwrap();
            let listener = UnixListener::bind(dir.path().join("companion.sock")).unwrap();

            let handle = std::thread::spawn(move || {
                let (stream, _) = listener.accept().unwrap();
                BufReader::new(stream)
                    .lines()
                    .map_while(Result::ok)
                    .collect()
            });

            Self { dir, handle }
        }

        fn socket(&self) -> PathBuf {
            self.dir.path().join("companion.sock")
        }

        fn frames(self) -> Vec<serde_json::Value> {
            self.handle
                .join()
                .unwrap()
                .iter()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn payload() -> PresencePayload {
        PresencePayload {
            details: "Playing".into(),
            state: "Level 3".into(),
            large_image_key: Some("cover".into()),
            small_image_key: None,
            start: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        }
    }

    #[test]
    fn full_session_wire_exchange() {
        let companion = FakeCompanion::spawn();
        let client = CompanionSocketClient::with_socket_path(companion.socket());

        let handle = client.connect("app-123").unwrap();
        client.publish(&handle, &payload()).unwrap();
        client.close(handle);

        let frames = companion.frames();
        assert_eq!(frames.len(), 3);

        assert_eq!(frames[0]["op"], "handshake");
        assert_eq!(frames[0]["application_id"], "app-123");

        assert_eq!(frames[1]["op"], "activity");
        assert_eq!(frames[1]["details"], "Playing");
        assert_eq!(frames[1]["large_image_key"], "cover");
        assert!(frames[1].get("small_image_key").is_none());
        assert_eq!(frames[1]["start"], 1_700_000_000i64);

        assert_eq!(frames[2]["op"], "close");
    }

    #[test]
    fn activity_without_start_omits_field() {
        let companion = FakeCompanion::spawn();
        let client = CompanionSocketClient::with_socket_path(companion.socket());

        let handle = client.connect("app-123").unwrap();
        let mut p = payload();
        p.start = None;
        client.publish(&handle, &p).unwrap();
        client.close(handle);

        let frames = companion.frames();
        assert!(frames[1].get("start").is_none());
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let client =
            CompanionSocketClient::with_socket_path(PathBuf::from("/nonexistent/companion.sock"));
        assert!(matches!(
            client.connect("app"),
            Err(ClientError::ConnectFailed(_))
        ));
    }

    #[test]
    fn publish_after_close_is_not_connected() {
        let companion = FakeCompanion::spawn();
        let client = CompanionSocketClient::with_socket_path(companion.socket());

        let handle = client.connect("app").unwrap();
        client.close(handle.clone());

        assert!(matches!(
            client.publish(&handle, &payload()),
            Err(ClientError::NotConnected)
        ));
        drop(companion);
    }
}
