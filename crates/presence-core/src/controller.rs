//! The watchdog state machine
//!
//! `PresenceController` owns the active-profile slot, the poll countdown,
//! and the decision logic tying the process probe to session transitions.
//! The daemon drives it with two timers: a 1-second watchdog tick (which
//! doubles as the UI countdown) and a 15-second keep-alive tick. The
//! controller is the sole caller of `SessionHandle` operations, and calls
//! them synchronously from the tick handlers.

use presence_api::{ControllerPhase, Profile, SessionInfo};
use presence_host_api::{PresenceClient, ProcessProbe};
use presence_util::{ProfileId, SessionId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{ControllerEvent, SessionHandle};

/// Default seconds between probes
pub const DEFAULT_POLL_INTERVAL_SECS: u32 = 5;

/// Seconds between keep-alive refreshes while attached
pub const KEEPALIVE_INTERVAL_SECS: u64 = 15;

/// Errors rejected before a session is created
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Profile '{0}' has no application id")]
    MissingApplicationId(ProfileId),

    #[error("Poll interval must be at least 1 second (got {0})")]
    InvalidPollInterval(u32),
}

/// One live session: the active profile and its connection handle.
///
/// At most one exists at a time; created on `start`, destroyed on `stop`
/// or on starting a different profile.
struct ActiveSession {
    session_id: SessionId,
    profile: Profile,
    handle: SessionHandle,
}

/// The presence lifecycle controller.
///
/// States: Idle (no session) -> Scanning (session, detached) -> Attached
/// (session, published) -> back to Scanning when the target disappears ->
/// Idle on explicit stop.
pub struct PresenceController {
    probe: Arc<dyn ProcessProbe>,
    client: Arc<dyn PresenceClient>,
    poll_interval: u32,
    countdown: u32,
    session: Option<ActiveSession>,
}

impl PresenceController {
    pub fn new(probe: Arc<dyn ProcessProbe>, client: Arc<dyn PresenceClient>) -> Self {
        Self {
            probe,
            client,
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            countdown: 0,
            session: None,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ControllerPhase {
        match &self.session {
            None => ControllerPhase::Idle,
            Some(s) if s.handle.attached() => ControllerPhase::Attached,
            Some(_) => ControllerPhase::Scanning,
        }
    }

    /// Whether any session exists (Scanning or Attached)
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The active profile's id, if any
    pub fn active_profile_id(&self) -> Option<&ProfileId> {
        self.session.as_ref().map(|s| &s.profile.id)
    }

    /// Session info for state snapshots
    pub fn session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(|s| SessionInfo {
            profile_id: s.profile.id.clone(),
            target: s.profile.target_label(),
            attached: s.handle.attached(),
            countdown: self.countdown,
        })
    }

    /// Configured seconds between probes
    pub fn poll_interval(&self) -> u32 {
        self.poll_interval
    }

    /// Set the poll interval. Takes effect at the next countdown reset.
    pub fn set_poll_interval(&mut self, seconds: u32) -> Result<(), ControllerError> {
        if seconds < 1 {
            return Err(ControllerError::InvalidPollInterval(seconds));
        }
        info!(seconds, "Poll interval set");
        self.poll_interval = seconds;
        Ok(())
    }

    /// Start broadcasting a profile.
    ///
    /// A profile without an application id is rejected here and never
    /// enters Scanning. Any existing session is stopped first, so exactly
    /// one deactivate precedes the next activate.
    pub fn start(&mut self, profile: Profile) -> Result<Vec<ControllerEvent>, ControllerError> {
        if profile.application_id.trim().is_empty() {
            return Err(ControllerError::MissingApplicationId(profile.id));
        }

        let mut events = Vec::new();
        if let Some(detached) = self.teardown() {
            events.push(detached);
        }

        let session_id = SessionId::new();
        info!(
            session_id = %session_id,
            profile_id = %profile.id,
            target = %profile.target_exe.display(),
            "Session starting"
        );

        self.session = Some(ActiveSession {
            session_id,
            profile,
            handle: SessionHandle::new(self.client.clone()),
        });
        // Forces a probe on the very next watchdog tick
        self.countdown = 0;

        Ok(events)
    }

    /// Stop the current session, deactivating if attached. No-op when Idle.
    pub fn stop(&mut self) -> Vec<ControllerEvent> {
        if self.session.is_none() {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(detached) = self.teardown() {
            events.push(detached);
        }
        events.push(ControllerEvent::StatusChanged("Stopped".into()));
        events.push(ControllerEvent::CountdownTick(0));
        events
    }

    /// Watchdog tick, called once per second while the daemon runs.
    ///
    /// Decrements and re-emits the countdown every second for UI display;
    /// the actual probe only runs when the countdown reaches zero, then the
    /// countdown resets to the configured poll interval.
    pub fn tick(&mut self) -> Vec<ControllerEvent> {
        if self.session.is_none() {
            return Vec::new();
        }

        if self.countdown > 0 {
            self.countdown -= 1;
            return vec![ControllerEvent::CountdownTick(self.countdown)];
        }

        let mut events = self.poll();
        self.countdown = self.poll_interval;
        events.push(ControllerEvent::CountdownTick(self.countdown));
        events
    }

    /// Keep-alive tick, called every 15 seconds.
    ///
    /// Refreshes the published payload only while attached; a failed
    /// refresh is logged and retried on the next keep-alive cycle.
    pub fn keepalive_tick(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.handle.attached() {
                if let Err(e) = session.handle.refresh() {
                    warn!(
                        session_id = %session.session_id,
                        profile_id = %session.profile.id,
                        error = %e,
                        "Keep-alive refresh failed"
                    );
                }
            }
        }
    }

    /// Run one probe and drive the session accordingly
    fn poll(&mut self) -> Vec<ControllerEvent> {
        let session = match self.session.as_mut() {
            Some(s) => s,
            None => return Vec::new(),
        };

        let running = match self.probe.is_running(&session.profile.target_exe) {
            Ok(r) => r,
            Err(e) => {
                // Conservative default: pausing presence beats erroring
                debug!(error = %e, "Probe failed, treating target as not running");
                false
            }
        };

        let mut events = Vec::new();

        if running {
            if !session.handle.attached() {
                match session
                    .handle
                    .activate(&session.profile, presence_util::now_utc())
                {
                    Ok(()) => {
                        let target = session.profile.target_label();
                        info!(
                            session_id = %session.session_id,
                            profile_id = %session.profile.id,
                            target = %target,
                            "Session attached"
                        );
                        events.push(ControllerEvent::StatusChanged(format!(
                            "Attached to {}",
                            target
                        )));
                        events.push(ControllerEvent::ToastRequested(format!(
                            "Running RPC for {}",
                            session.profile.id
                        )));
                        events.push(ControllerEvent::SessionAttached {
                            profile_id: session.profile.id.clone(),
                            target,
                        });
                    }
                    Err(e) => {
                        // Non-fatal: stay in Scanning, retried next poll
                        warn!(
                            session_id = %session.session_id,
                            profile_id = %session.profile.id,
                            error = %e,
                            "Activation failed, will retry"
                        );
                        events.push(ControllerEvent::StatusChanged(format!("Error: {}", e)));
                    }
                }
            }
            // Attached and still running: nothing to do
        } else if session.handle.attached() {
            session.handle.deactivate();
            info!(
                session_id = %session.session_id,
                profile_id = %session.profile.id,
                "Target closed, presence withdrawn"
            );
            events.push(ControllerEvent::StatusChanged(
                "Target closed. Scanning...".into(),
            ));
            events.push(ControllerEvent::ToastRequested(
                "Target closed. Pausing RPC...".into(),
            ));
            events.push(ControllerEvent::SessionDetached {
                profile_id: session.profile.id.clone(),
            });
        } else {
            events.push(ControllerEvent::StatusChanged(
                "Scanning for target...".into(),
            ));
        }

        events
    }

    /// Destroy the current session, deactivating first.
    /// Returns a detach event when a live connection was closed.
    fn teardown(&mut self) -> Option<ControllerEvent> {
        let mut session = self.session.take()?;
        let was_attached = session.handle.attached();
        session.handle.deactivate();
        self.countdown = 0;

        info!(
            session_id = %session.session_id,
            profile_id = %session.profile.id,
            was_attached,
            "Session destroyed"
        );

        if was_attached {
            Some(ControllerEvent::SessionDetached {
                profile_id: session.profile.id,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_host_api::{MockClient, MockProbe};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    fn make_profile(id: &str) -> Profile {
        Profile {
            id: ProfileId::new(id),
            application_id: "123456789".into(),
            details: "Testing".into(),
            state: "".into(),
            large_image_key: None,
            small_image_key: None,
            target_exe: PathBuf::from("/usr/bin/game.exe"),
            timestamp: Default::default(),
        }
    }

    fn setup(running: bool) -> (PresenceController, Arc<MockClient>, Arc<MockProbe>) {
        let client = Arc::new(MockClient::new());
        let probe = Arc::new(MockProbe::new(running));
        let controller = PresenceController::new(probe.clone(), client.clone());
        (controller, client, probe)
    }

    fn statuses(events: &[ControllerEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::StatusChanged(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    fn toasts(events: &[ControllerEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::ToastRequested(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rejects_profile_without_application_id() {
        let (mut controller, _, _) = setup(true);

        let mut profile = make_profile("broken");
        profile.application_id = "  ".into();

        assert!(matches!(
            controller.start(profile),
            Err(ControllerError::MissingApplicationId(_))
        ));
        // Never entered Scanning
        assert_eq!(controller.phase(), ControllerPhase::Idle);
    }

    #[test]
    fn first_tick_probes_immediately() {
        let (mut controller, client, _) = setup(true);
        controller.start(make_profile("game")).unwrap();

        assert_eq!(controller.phase(), ControllerPhase::Scanning);

        let events = controller.tick();
        assert_eq!(controller.phase(), ControllerPhase::Attached);
        assert_eq!(client.connect_count(), 1);
        assert_eq!(statuses(&events), vec!["Attached to game"]);
        assert_eq!(toasts(&events), vec!["Running RPC for game"]);
    }

    #[test]
    fn scanning_status_while_target_absent() {
        let (mut controller, client, _) = setup(false);
        controller.start(make_profile("game")).unwrap();

        let events = controller.tick();
        assert_eq!(statuses(&events), vec!["Scanning for target..."]);
        assert!(toasts(&events).is_empty());
        assert_eq!(controller.phase(), ControllerPhase::Scanning);
        assert_eq!(client.connect_count(), 0);
    }

    #[test]
    fn countdown_decrements_between_probes() {
        let (mut controller, client, _) = setup(false);
        controller.start(make_profile("game")).unwrap();

        // First tick probes and resets countdown to the interval (5)
        let events = controller.tick();
        assert!(events.contains(&ControllerEvent::CountdownTick(5)));

        // Next four ticks only count down, no probe
        for expected in (1..=4).rev() {
            let events = controller.tick();
            assert_eq!(events, vec![ControllerEvent::CountdownTick(expected)]);
        }
        assert_eq!(client.connect_count(), 0);

        // Countdown reached 0: the fifth tick probes again
        let events = controller.tick();
        assert!(statuses(&events).contains(&"Scanning for target..."));
        assert!(events.contains(&ControllerEvent::CountdownTick(5)));
    }

    #[test]
    fn interval_change_applies_at_next_reset() {
        let (mut controller, _, _) = setup(false);
        controller.start(make_profile("game")).unwrap();
        controller.tick(); // probe, countdown -> 5

        controller.set_poll_interval(2).unwrap();

        // Current cycle keeps counting from 5
        assert_eq!(controller.tick(), vec![ControllerEvent::CountdownTick(4)]);
        assert_eq!(controller.tick(), vec![ControllerEvent::CountdownTick(3)]);
        assert_eq!(controller.tick(), vec![ControllerEvent::CountdownTick(2)]);
        assert_eq!(controller.tick(), vec![ControllerEvent::CountdownTick(1)]);
        assert_eq!(controller.tick(), vec![ControllerEvent::CountdownTick(0)]);

        // Probe tick re-arms with the new interval
        let events = controller.tick();
        assert!(events.contains(&ControllerEvent::CountdownTick(2)));
    }

    #[test]
    fn rejects_zero_interval() {
        let (mut controller, _, _) = setup(false);
        assert!(matches!(
            controller.set_poll_interval(0),
            Err(ControllerError::InvalidPollInterval(0))
        ));
    }

    #[test]
    fn target_disappearance_detaches() {
        let (mut controller, client, probe) = setup(true);
        controller.start(make_profile("game")).unwrap();
        controller.tick();
        assert_eq!(controller.phase(), ControllerPhase::Attached);

        probe.set_running(false);
        // Drain the countdown to the next probe
        for _ in 0..5 {
            controller.tick();
        }
        let events = controller.tick();

        assert_eq!(controller.phase(), ControllerPhase::Scanning);
        assert_eq!(statuses(&events), vec!["Target closed. Scanning..."]);
        assert_eq!(toasts(&events), vec!["Target closed. Pausing RPC..."]);
        assert_eq!(client.close_count(), 1);
    }

    #[test]
    fn start_then_stop_balances_connections() {
        let (mut controller, client, _) = setup(true);

        controller.start(make_profile("game")).unwrap();
        controller.tick(); // attach
        let events = controller.stop();

        assert_eq!(controller.phase(), ControllerPhase::Idle);
        assert_eq!(client.connect_count(), client.close_count());
        assert_eq!(client.open_connections(), 0);
        assert!(statuses(&events).contains(&"Stopped"));
        assert!(events.contains(&ControllerEvent::CountdownTick(0)));
    }

    #[test]
    fn stop_while_idle_is_noop() {
        let (mut controller, _, _) = setup(true);
        assert!(controller.stop().is_empty());
    }

    #[test]
    fn switching_profiles_deactivates_before_activating() {
        let (mut controller, client, _) = setup(true);

        controller.start(make_profile("alpha")).unwrap();
        controller.tick();
        assert_eq!(client.connect_count(), 1);

        // Implicit stop of alpha, then beta attaches on its first tick
        let events = controller.start(make_profile("beta")).unwrap();
        assert_eq!(client.close_count(), 1);
        assert!(events.contains(&ControllerEvent::SessionDetached {
            profile_id: ProfileId::new("alpha"),
        }));

        controller.tick();
        assert_eq!(client.connect_count(), 2);
        assert_eq!(client.open_connections(), 1);
        assert_eq!(controller.active_profile_id(), Some(&ProfileId::new("beta")));
    }

    #[test]
    fn keepalive_refreshes_only_while_attached() {
        let (mut controller, client, probe) = setup(false);

        // Idle: no publishes
        controller.keepalive_tick();
        assert_eq!(client.publish_count(), 0);

        // Scanning: still none
        controller.start(make_profile("game")).unwrap();
        controller.tick();
        controller.keepalive_tick();
        assert_eq!(client.publish_count(), 0);

        // Attached: one publish from activation, then one per keep-alive
        probe.set_running(true);
        for _ in 0..6 {
            controller.tick();
        }
        assert_eq!(controller.phase(), ControllerPhase::Attached);
        assert_eq!(client.publish_count(), 1);

        controller.keepalive_tick();
        controller.keepalive_tick();
        assert_eq!(client.publish_count(), 3);
    }

    #[test]
    fn failed_activation_keeps_scanning_and_retries() {
        let (mut controller, client, _) = setup(true);
        client.fail_connect.store(true, Ordering::SeqCst);

        controller.start(make_profile("game")).unwrap();
        let events = controller.tick();

        assert_eq!(controller.phase(), ControllerPhase::Scanning);
        assert!(statuses(&events)[0].starts_with("Error:"));

        // Companion comes back; next probe succeeds
        client.fail_connect.store(false, Ordering::SeqCst);
        for _ in 0..5 {
            controller.tick();
        }
        let events = controller.tick();
        assert_eq!(controller.phase(), ControllerPhase::Attached);
        assert_eq!(statuses(&events), vec!["Attached to game"]);
    }

    #[test]
    fn probe_error_treated_as_not_running() {
        let (mut controller, client, probe) = setup(true);
        probe.fail.store(true, Ordering::SeqCst);

        controller.start(make_profile("game")).unwrap();
        let events = controller.tick();

        assert_eq!(controller.phase(), ControllerPhase::Scanning);
        assert_eq!(statuses(&events), vec!["Scanning for target..."]);
        assert_eq!(client.connect_count(), 0);
    }

    #[test]
    fn empty_target_attaches_immediately() {
        let (mut controller, client, probe) = setup(false);
        // Probe says "not running", but a gate-less profile ignores that
        probe.fail.store(true, Ordering::SeqCst);

        let mut profile = make_profile("always-on");
        profile.target_exe = PathBuf::new();

        controller.start(profile).unwrap();
        controller.tick();

        assert_eq!(controller.phase(), ControllerPhase::Attached);
        assert_eq!(client.connect_count(), 1);
    }

    #[test]
    fn idle_ticks_emit_nothing() {
        let (mut controller, client, _) = setup(true);

        assert!(controller.tick().is_empty());
        controller.keepalive_tick();
        assert_eq!(client.connect_count(), 0);
        assert_eq!(client.publish_count(), 0);
    }

    #[test]
    fn session_info_reflects_state() {
        let (mut controller, _, _) = setup(true);
        assert!(controller.session_info().is_none());

        controller.start(make_profile("game")).unwrap();
        controller.tick();

        let info = controller.session_info().unwrap();
        assert_eq!(info.profile_id, ProfileId::new("game"));
        assert_eq!(info.target, "game");
        assert!(info.attached);
        assert_eq!(info.countdown, 5);
    }
}
