//! presencectl - command-line client for presenced

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use presence_api::{
    Command, ControllerPhase, EventPayload, Response, ResponsePayload, ResponseResult,
};
use presence_ipc::IpcClient;
use presence_util::ProfileId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "presencectl")]
#[command(about = "Control and inspect presenced", long_about = None)]
struct Args {
    /// Socket path override (or set PRESENCED_SOCKET env var)
    #[arg(short, long, env = presence_util::PRESENCED_SOCKET_ENV)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand, Debug)]
enum CtlCommand {
    /// Show the daemon's current state
    Status,

    /// List all known profiles
    Profiles,

    /// Start broadcasting a profile
    Start {
        /// Profile name
        profile: String,
    },

    /// Stop the current session
    Stop,

    /// Set the watchdog poll interval in seconds
    SetInterval {
        /// Seconds between probes (minimum 1)
        seconds: u32,
    },

    /// Re-read profiles.json from disk
    Reload,

    /// Register or withdraw the daemon's autostart entry
    SetRunAtStartup {
        /// true to register, false to withdraw
        enabled: bool,
    },

    /// Show daemon health
    Health,

    /// Stream events until interrupted
    Watch,
}

fn unwrap_response(response: Response) -> Result<ResponsePayload> {
    match response.result {
        ResponseResult::Ok(payload) => Ok(payload),
        ResponseResult::Err(e) => bail!("{:?}: {}", e.code, e.message),
    }
}

fn phase_label(phase: ControllerPhase) -> &'static str {
    match phase {
        ControllerPhase::Idle => "idle",
        ControllerPhase::Scanning => "scanning",
        ControllerPhase::Attached => "attached",
    }
}

async fn run(args: Args) -> Result<()> {
    let socket_path = args
        .socket
        .unwrap_or_else(presence_util::default_socket_path);

    let mut client = IpcClient::connect(&socket_path).await.map_err(|e| {
        anyhow::anyhow!(
            "Cannot connect to presenced at {} ({}). Is the daemon running?",
            socket_path.display(),
            e
        )
    })?;

    match args.command {
        CtlCommand::Status => {
            let payload = unwrap_response(client.send(Command::GetState).await?)?;
            let ResponsePayload::State(state) = payload else {
                bail!("Unexpected response");
            };

            println!("phase:         {}", phase_label(state.phase));
            println!("profiles:      {}", state.profile_count);
            println!("poll interval: {}s", state.poll_interval_seconds);
            if let Some(session) = state.session {
                println!("profile:       {}", session.profile_id);
                println!("target:        {}", session.target);
                println!("next probe in: {}s", session.countdown);
            }
        }

        CtlCommand::Profiles => {
            let payload = unwrap_response(client.send(Command::ListProfiles).await?)?;
            let ResponsePayload::Profiles(profiles) = payload else {
                bail!("Unexpected response");
            };

            if profiles.is_empty() {
                println!("No profiles defined");
            }
            for profile in profiles {
                let target = if profile.has_target() {
                    profile.target_label()
                } else {
                    "(always on)".into()
                };
                println!("{}\t{}\t{}", profile.id, profile.details, target);
            }
        }

        CtlCommand::Start { profile } => {
            let payload = unwrap_response(
                client
                    .send(Command::Start {
                        profile_id: ProfileId::new(profile),
                    })
                    .await?,
            )?;
            if let ResponsePayload::Started { profile_id } = payload {
                println!("Started '{}'", profile_id);
            }
        }

        CtlCommand::Stop => {
            unwrap_response(client.send(Command::Stop).await?)?;
            println!("Stopped");
        }

        CtlCommand::SetInterval { seconds } => {
            let payload =
                unwrap_response(client.send(Command::SetPollInterval { seconds }).await?)?;
            if let ResponsePayload::IntervalSet { seconds } = payload {
                println!("Poll interval set to {}s", seconds);
            }
        }

        CtlCommand::Reload => {
            let payload = unwrap_response(client.send(Command::ReloadProfiles).await?)?;
            if let ResponsePayload::ProfilesReloaded { profile_count } = payload {
                println!("Reloaded {} profiles", profile_count);
            }
        }

        CtlCommand::SetRunAtStartup { enabled } => {
            let payload =
                unwrap_response(client.send(Command::SetRunAtStartup { enabled }).await?)?;
            if let ResponsePayload::RunAtStartupSet { enabled } = payload {
                if enabled {
                    println!("Run at startup enabled");
                } else {
                    println!("Run at startup disabled");
                }
            }
        }

        CtlCommand::Health => {
            let payload = unwrap_response(client.send(Command::GetHealth).await?)?;
            let ResponsePayload::Health(health) = payload else {
                bail!("Unexpected response");
            };

            println!("live:            {}", health.live);
            println!("ready:           {}", health.ready);
            println!("profiles loaded: {}", health.profiles_loaded);
            println!("store ok:        {}", health.store_ok);
        }

        CtlCommand::Watch => {
            let mut events = client.subscribe().await?;
            loop {
                let event = events.next().await?;
                match event.payload {
                    EventPayload::StateChanged(state) => {
                        println!("[state] {}", phase_label(state.phase));
                    }
                    EventPayload::StatusChanged { text } => println!("[status] {}", text),
                    EventPayload::ToastRequested { text } => println!("[toast] {}", text),
                    EventPayload::CountdownTick { seconds_remaining } => {
                        println!("[countdown] {}s", seconds_remaining);
                    }
                    EventPayload::SessionAttached { profile_id, target } => {
                        println!("[attached] {} ({})", profile_id, target);
                    }
                    EventPayload::SessionDetached { profile_id } => {
                        println!("[detached] {}", profile_id);
                    }
                    EventPayload::ProfilesReloaded { profile_count } => {
                        println!("[reload] {} profiles", profile_count);
                    }
                    EventPayload::Shutdown => {
                        println!("[shutdown] daemon exiting");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Args::parse()).await
}
