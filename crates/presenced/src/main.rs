//! presenced - the presence watchdog daemon
//!
//! Wires together all the components:
//! - Profile and settings stores (JSON under the data directory)
//! - The lifecycle controller (watchdog state machine)
//! - The Linux host adapter (process probe, companion socket)
//! - The IPC server (NDJSON over a Unix socket)
//!
//! Two timers drive the controller: a 1-second watchdog tick and a
//! 15-second keep-alive tick. Everything that touches the controller runs
//! on this one task, so tick and command handling never interleave.

use anyhow::{Context, Result};
use clap::Parser;
use presence_api::{
    Command, DaemonStateSnapshot, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Profile,
    Response, ResponsePayload, API_VERSION,
};
use presence_core::{ControllerError, ControllerEvent, PresenceController, KEEPALIVE_INTERVAL_SECS};
use presence_host_linux::{CompanionSocketClient, LinuxProcessProbe};
use presence_ipc::{IpcServer, ServerMessage};
use presence_store::{find_profile, AppSettings, ProfileStore, SettingsStore};
use presence_util::ClientId;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// presenced - profile-driven rich presence gated on a target process
#[derive(Parser, Debug)]
#[command(name = "presenced")]
#[command(about = "Presence watchdog daemon", long_about = None)]
struct Args {
    /// Socket path override (or set PRESENCED_SOCKET env var)
    #[arg(short, long, env = presence_util::PRESENCED_SOCKET_ENV)]
    socket: Option<PathBuf>,

    /// Data directory override (or set PRESENCED_DATA_DIR env var)
    #[arg(short, long, env = presence_util::PRESENCED_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main daemon state, owned by the event loop task
struct Service {
    controller: PresenceController,
    profiles: Vec<Profile>,
    profile_store: ProfileStore,
    settings_store: SettingsStore,
    settings: AppSettings,
    ipc: Arc<IpcServer>,
    profiles_loaded: bool,
    exec_path: PathBuf,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(presence_util::default_data_dir);

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let profile_store = ProfileStore::new(&data_dir);
        let settings_store = SettingsStore::new(&data_dir);

        // A corrupt catalog must not take the daemon down; it starts empty
        // and the operator fixes the file and reloads
        let (profiles, profiles_loaded) = match profile_store.load() {
            Ok(profiles) => (profiles, true),
            Err(e) => {
                error!(error = %e, "Failed to load profiles, starting with empty catalog");
                (Vec::new(), false)
            }
        };

        let settings = settings_store.load();
        info!(
            data_dir = %data_dir.display(),
            profile_count = profiles.len(),
            poll_interval = settings.poll_interval_seconds,
            "Stores initialized"
        );

        let probe = Arc::new(LinuxProcessProbe::new());
        let client = Arc::new(CompanionSocketClient::new());
        let mut controller = PresenceController::new(probe, client);

        if let Err(e) = controller.set_poll_interval(settings.poll_interval_seconds) {
            warn!(error = %e, "Stored poll interval invalid, keeping default");
        }

        let exec_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("presenced"));
        if let Err(e) = presence_store::set_run_at_startup(settings.run_at_startup, &exec_path) {
            warn!(error = %e, "Failed to sync autostart entry");
        }

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(presence_util::default_socket_path);

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        Ok(Self {
            controller,
            profiles,
            profile_store,
            settings_store,
            settings,
            ipc: Arc::new(ipc),
            profiles_loaded,
            exec_path,
        })
    }

    async fn run(mut self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        // IPC accept task
        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        // Watchdog ticks once per second; the poll cadence comes from the
        // controller's countdown, not from this timer
        let mut watchdog = tokio::time::interval(Duration::from_secs(1));
        let mut keepalive = tokio::time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));

        // Resume the last profile if configured
        self.auto_start();

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP re-reads the profile catalog
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading profiles");
                    if let Err(e) = self.reload_profiles() {
                        error!(error = %e, "Profile reload failed");
                    }
                }

                _ = watchdog.tick() => {
                    let events = self.controller.tick();
                    self.broadcast_controller_events(events);
                }

                _ = keepalive.tick() => {
                    self.controller.keepalive_tick();
                }

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        // Graceful shutdown: withdraw any live presence first
        let events = self.controller.stop();
        self.broadcast_controller_events(events);
        self.ipc.broadcast_event(Event::new(EventPayload::Shutdown));
        self.ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    /// Start the last-used profile if auto-start is enabled
    fn auto_start(&mut self) {
        if !self.settings.auto_start {
            return;
        }
        let Some(profile_id) = self.settings.last_profile_id.clone() else {
            return;
        };

        let Some(profile) = find_profile(&self.profiles, &profile_id).cloned() else {
            warn!(profile_id = %profile_id, "Auto-start profile no longer exists");
            return;
        };

        info!(profile_id = %profile_id, "Auto-starting last profile");
        match self.controller.start(profile) {
            Ok(events) => self.broadcast_controller_events(events),
            Err(e) => warn!(profile_id = %profile_id, error = %e, "Auto-start rejected"),
        }
    }

    fn snapshot(&self) -> DaemonStateSnapshot {
        DaemonStateSnapshot {
            api_version: API_VERSION,
            phase: self.controller.phase(),
            session: self.controller.session_info(),
            profile_count: self.profiles.len(),
            poll_interval_seconds: self.controller.poll_interval(),
        }
    }

    /// Fan controller events out to subscribed clients.
    ///
    /// Attach and detach also push a fresh state snapshot so stateless
    /// shells can re-render without a follow-up GetState.
    fn broadcast_controller_events(&self, events: Vec<ControllerEvent>) {
        for event in events {
            match event {
                ControllerEvent::StatusChanged(text) => {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::StatusChanged { text }));
                }
                ControllerEvent::ToastRequested(text) => {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::ToastRequested { text }));
                }
                ControllerEvent::CountdownTick(seconds_remaining) => {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::CountdownTick {
                            seconds_remaining,
                        }));
                }
                ControllerEvent::SessionAttached { profile_id, target } => {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::SessionAttached {
                            profile_id,
                            target,
                        }));
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::StateChanged(self.snapshot())));
                }
                ControllerEvent::SessionDetached { profile_id } => {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::SessionDetached { profile_id }));
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::StateChanged(self.snapshot())));
                }
            }
        }
    }

    fn reload_profiles(&mut self) -> Result<usize, presence_store::StoreError> {
        let profiles = self.profile_store.load()?;
        let profile_count = profiles.len();
        // A running session keeps its own immutable snapshot of the
        // profile; reload only affects future starts
        self.profiles = profiles;
        self.profiles_loaded = true;

        self.ipc
            .broadcast_event(Event::new(EventPayload::ProfilesReloaded { profile_count }));
        Ok(profile_count)
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings_store.save(&self.settings) {
            warn!(error = %e, "Failed to persist settings");
        }
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let follow_up_snapshot = matches!(request.command, Command::SubscribeEvents);
                let response = self
                    .handle_command(&client_id, request.request_id, request.command)
                    .await;
                let _ = self.ipc.send_response(&client_id, response).await;

                // New subscribers get a snapshot, queued after the ack so
                // the first line a subscriber reads is always its response
                if follow_up_snapshot {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::StateChanged(self.snapshot())));
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(client_id = %client_id, uid = ?info.uid, "Client connected");
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }

    async fn handle_command(
        &mut self,
        client_id: &ClientId,
        request_id: u64,
        command: Command,
    ) -> Response {
        match command {
            Command::GetState => {
                Response::success(request_id, ResponsePayload::State(self.snapshot()))
            }

            Command::ListProfiles => {
                Response::success(request_id, ResponsePayload::Profiles(self.profiles.clone()))
            }

            Command::Start { profile_id } => {
                let Some(profile) = find_profile(&self.profiles, &profile_id).cloned() else {
                    return Response::error(
                        request_id,
                        ErrorInfo::new(
                            ErrorCode::ProfileNotFound,
                            format!("No profile named '{}'", profile_id),
                        ),
                    );
                };

                match self.controller.start(profile) {
                    Ok(events) => {
                        self.broadcast_controller_events(events);
                        self.ipc
                            .broadcast_event(Event::new(EventPayload::StateChanged(
                                self.snapshot(),
                            )));

                        self.settings.last_profile_id = Some(profile_id.clone());
                        self.save_settings();

                        Response::success(request_id, ResponsePayload::Started { profile_id })
                    }
                    Err(e @ ControllerError::MissingApplicationId(_)) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::MissingApplicationId, e.to_string()),
                    ),
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::InternalError, e.to_string()),
                    ),
                }
            }

            Command::Stop => {
                if !self.controller.has_session() {
                    return Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::NoActiveSession, "No active session"),
                    );
                }

                let events = self.controller.stop();
                self.broadcast_controller_events(events);
                self.ipc
                    .broadcast_event(Event::new(EventPayload::StateChanged(self.snapshot())));

                Response::success(request_id, ResponsePayload::Stopped)
            }

            Command::SetPollInterval { seconds } => {
                match self.controller.set_poll_interval(seconds) {
                    Ok(()) => {
                        self.settings.poll_interval_seconds = seconds;
                        self.save_settings();
                        self.ipc
                            .broadcast_event(Event::new(EventPayload::StateChanged(
                                self.snapshot(),
                            )));

                        Response::success(request_id, ResponsePayload::IntervalSet { seconds })
                    }
                    Err(e) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::InvalidInterval, e.to_string()),
                    ),
                }
            }

            Command::ReloadProfiles => match self.reload_profiles() {
                Ok(profile_count) => Response::success(
                    request_id,
                    ResponsePayload::ProfilesReloaded { profile_count },
                ),
                Err(e) => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                ),
            },

            Command::SubscribeEvents => {
                Response::success(
                    request_id,
                    ResponsePayload::Subscribed {
                        client_id: client_id.clone(),
                    },
                )
            }

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::SetRunAtStartup { enabled } => {
                if let Err(e) = presence_store::set_run_at_startup(enabled, &self.exec_path) {
                    return Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
                    );
                }

                self.settings.run_at_startup = enabled;
                self.save_settings();

                Response::success(request_id, ResponsePayload::RunAtStartupSet { enabled })
            }

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    profiles_loaded: self.profiles_loaded,
                    store_ok: self.profile_store.path().parent().map(|p| p.exists()).unwrap_or(false),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "presenced starting");

    if presence_util::is_mock_time_active() {
        warn!("Mock time offset active, timestamps will not match the wall clock");
    }

    let service = Service::new(&args).await?;
    service.run().await
}
