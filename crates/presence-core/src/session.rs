//! Session handle: ownership of one companion connection

use chrono::{DateTime, Utc};
use presence_api::{PresencePayload, Profile};
use presence_host_api::{ClientError, ConnectionHandle, PresenceClient};
use std::sync::Arc;
use tracing::debug;

/// Build the presence payload for a profile at a given instant.
///
/// The start instant is resolved fresh each call (see [`crate::resolve_start`]).
pub fn build_payload(profile: &Profile, now: DateTime<Utc>) -> PresencePayload {
    PresencePayload {
        details: profile.details.clone(),
        state: profile.state.clone(),
        large_image_key: profile.large_image_key.clone(),
        small_image_key: profile.small_image_key.clone(),
        start: crate::resolve_start(&profile.timestamp, now),
    }
}

/// Owns the lifetime of one connection to the companion process.
///
/// Exactly one `SessionHandle` exists per live session; nothing else may
/// call publish/close on its connection. Invariant: after any operation,
/// either the handle is attached with a published payload, or it holds no
/// connection at all. Never half-open.
pub struct SessionHandle {
    client: Arc<dyn PresenceClient>,
    connection: Option<ConnectionHandle>,
    last_payload: Option<PresencePayload>,
}

impl SessionHandle {
    pub fn new(client: Arc<dyn PresenceClient>) -> Self {
        Self {
            client,
            connection: None,
            last_payload: None,
        }
    }

    /// Whether a connection is currently open
    pub fn attached(&self) -> bool {
        self.connection.is_some()
    }

    /// Open a connection and publish the profile's presence.
    ///
    /// On any failure the handle ends detached and the error surfaces to
    /// the caller as a status message, never as a crash.
    pub fn activate(&mut self, profile: &Profile, now: DateTime<Utc>) -> Result<(), ClientError> {
        // Stale connection from a previous attempt gets closed first
        self.deactivate();

        let connection = self.client.connect(&profile.application_id)?;
        let payload = build_payload(profile, now);

        if let Err(e) = self.client.publish(&connection, &payload) {
            self.client.close(connection);
            return Err(e);
        }

        debug!(profile_id = %profile.id, "Presence published");

        self.connection = Some(connection);
        self.last_payload = Some(payload);
        Ok(())
    }

    /// Re-publish the last payload unchanged, resetting the companion's
    /// expiry clock. No-op when detached.
    pub fn refresh(&mut self) -> Result<(), ClientError> {
        match (&self.connection, &self.last_payload) {
            (Some(connection), Some(payload)) => self.client.publish(connection, payload),
            _ => Ok(()),
        }
    }

    /// Close the connection if attached. Idempotent.
    pub fn deactivate(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.client.close(connection);
        }
        self.last_payload = None;
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_api::{OffsetUnit, TimestampConfig};
    use presence_host_api::MockClient;
    use presence_util::ProfileId;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    fn make_profile() -> Profile {
        Profile {
            id: ProfileId::new("coding"),
            application_id: "123456789".into(),
            details: "Writing code".into(),
            state: "Focused".into(),
            large_image_key: Some("editor".into()),
            small_image_key: None,
            target_exe: PathBuf::from("/usr/bin/code.exe"),
            timestamp: TimestampConfig::None,
        }
    }

    #[test]
    fn activate_publishes_profile_fields() {
        let client = Arc::new(MockClient::new());
        let mut handle = SessionHandle::new(client.clone());

        handle.activate(&make_profile(), Utc::now()).unwrap();

        assert!(handle.attached());
        let payload = client.last_payload().unwrap();
        assert_eq!(payload.details, "Writing code");
        assert_eq!(payload.large_image_key.as_deref(), Some("editor"));
        assert_eq!(payload.start, None);
    }

    #[test]
    fn activate_resolves_relative_start() {
        let client = Arc::new(MockClient::new());
        let mut handle = SessionHandle::new(client.clone());

        let mut profile = make_profile();
        profile.timestamp = TimestampConfig::RelativeOffset {
            magnitude: 2,
            unit: OffsetUnit::Hours,
        };

        let now = Utc::now();
        handle.activate(&profile, now).unwrap();

        let start = client.last_payload().unwrap().start.unwrap();
        assert_eq!(now.signed_duration_since(start).num_seconds(), 7200);
    }

    #[test]
    fn failed_connect_leaves_detached() {
        let client = Arc::new(MockClient::new());
        client.fail_connect.store(true, Ordering::SeqCst);
        let mut handle = SessionHandle::new(client.clone());

        assert!(handle.activate(&make_profile(), Utc::now()).is_err());
        assert!(!handle.attached());
        assert_eq!(client.open_connections(), 0);
    }

    #[test]
    fn failed_publish_closes_connection() {
        let client = Arc::new(MockClient::new());
        client.fail_publish.store(true, Ordering::SeqCst);
        let mut handle = SessionHandle::new(client.clone());

        assert!(handle.activate(&make_profile(), Utc::now()).is_err());

        // No half-open connection left behind
        assert!(!handle.attached());
        assert_eq!(client.open_connections(), 0);
        assert_eq!(client.connect_count(), client.close_count());
    }

    #[test]
    fn refresh_republishes_unchanged() {
        let client = Arc::new(MockClient::new());
        let mut handle = SessionHandle::new(client.clone());

        handle.activate(&make_profile(), Utc::now()).unwrap();
        let first = client.last_payload().unwrap();

        handle.refresh().unwrap();
        assert_eq!(client.publish_count(), 2);
        assert_eq!(client.last_payload().unwrap(), first);
    }

    #[test]
    fn refresh_detached_is_noop() {
        let client = Arc::new(MockClient::new());
        let mut handle = SessionHandle::new(client.clone());

        handle.refresh().unwrap();
        assert_eq!(client.publish_count(), 0);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let client = Arc::new(MockClient::new());
        let mut handle = SessionHandle::new(client.clone());

        handle.activate(&make_profile(), Utc::now()).unwrap();
        handle.deactivate();
        handle.deactivate();

        assert_eq!(client.close_count(), 1);
        assert_eq!(client.open_connections(), 0);
    }

    #[test]
    fn drop_closes_connection() {
        let client = Arc::new(MockClient::new());
        {
            let mut handle = SessionHandle::new(client.clone());
            handle.activate(&make_profile(), Utc::now()).unwrap();
        }
        assert_eq!(client.open_connections(), 0);
    }
}
