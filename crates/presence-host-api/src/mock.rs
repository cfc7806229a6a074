//! Mock client and probe for testing

use presence_api::PresencePayload;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::{
    ClientError, ClientResult, ConnectionHandle, HandlePayload, PresenceClient, ProbeError,
    ProcessProbe,
};

/// Mock companion client for unit/integration testing.
///
/// Counts connect/publish/close calls and tracks open connections so tests
/// can assert the activate/deactivate balance.
pub struct MockClient {
    next_id: AtomicU64,
    open: Mutex<HashSet<u64>>,
    published: Mutex<Vec<PresencePayload>>,
    connect_calls: AtomicU64,
    close_calls: AtomicU64,

    /// Configure connect to fail
    pub fail_connect: AtomicBool,

    /// Configure publish to fail
    pub fail_publish: AtomicBool,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            open: Mutex::new(HashSet::new()),
            published: Mutex::new(Vec::new()),
            connect_calls: AtomicU64::new(0),
            close_calls: AtomicU64::new(0),
            fail_connect: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
        }
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> u64 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of close calls
    pub fn close_count(&self) -> u64 {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Number of publish calls (initial + keep-alive refreshes)
    pub fn publish_count(&self) -> u64 {
        self.published.lock().unwrap().len() as u64
    }

    /// Currently open (connected, not yet closed) connection count
    pub fn open_connections(&self) -> usize {
        self.open.lock().unwrap().len()
    }

    /// The most recently published payload, if any
    pub fn last_payload(&self) -> Option<PresencePayload> {
        self.published.lock().unwrap().last().cloned()
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceClient for MockClient {
    fn connect(&self, application_id: &str) -> ClientResult<ConnectionHandle> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectFailed("Mock connect failure".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.open.lock().unwrap().insert(id);
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        Ok(ConnectionHandle::new(
            application_id,
            HandlePayload::Mock { id },
        ))
    }

    fn publish(&self, handle: &ConnectionHandle, payload: &PresencePayload) -> ClientResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ClientError::PublishFailed("Mock publish failure".into()));
        }

        let id = match handle.payload() {
            HandlePayload::Mock { id } => *id,
            _ => return Err(ClientError::Internal("Wrong handle type".into())),
        };

        if !self.open.lock().unwrap().contains(&id) {
            return Err(ClientError::NotConnected);
        }

        self.published.lock().unwrap().push(payload.clone());
        Ok(())
    }

    fn close(&self, handle: ConnectionHandle) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);

        if let HandlePayload::Mock { id } = handle.payload() {
            self.open.lock().unwrap().remove(id);
        }
    }
}

/// Mock process probe with a settable answer
pub struct MockProbe {
    running: AtomicBool,

    /// Configure the probe to fail enumeration
    pub fail: AtomicBool,
}

impl MockProbe {
    pub fn new(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
            fail: AtomicBool::new(false),
        }
    }

    /// Flip whether the (non-empty) target counts as running
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

impl ProcessProbe for MockProbe {
    fn is_running(&self, exe_path: &Path) -> Result<bool, ProbeError> {
        // Degenerate rule: no target means always running
        if exe_path.as_os_str().is_empty() {
            return Ok(true);
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(ProbeError::Enumeration("Mock enumeration failure".into()));
        }

        Ok(self.running.load(Ordering::SeqCst))
    }
}
