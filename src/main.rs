//! Terminal host for capture-relay
//!
//! Records from the local camera and microphone. Notifications are printed to
//! stdout as JSON lines; `pause`, `resume` and `stop` are read from stdin.

use anyhow::{anyhow, Context};
use capture_relay::bridge::{ChannelBridge, HostNotification};
use capture_relay::capture::native::NativeMediaDevices;
use capture_relay::commands::{recording, system, RelayState};
use capture_relay::config::RelayConfig;
use capture_relay::logging::init_logging;
use capture_relay::recorder::{CaptureRelay, ObjectUrlStore};
use capture_relay::ErrorResponse;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "capture-relay")]
#[command(version)]
#[command(about = "Record camera and microphone, relaying recorder events as JSON lines")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record until `stop` is read from stdin or stdin closes
    #[command(visible_alias = "r")]
    Record {
        /// Display surface the capture is bound to
        #[arg(short, long, default_value = "preview")]
        surface: String,

        /// Write the recording to FILE when it stops
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List microphones and cameras
    #[command(visible_alias = "ls")]
    ListDevices,
}

fn command_error(error: ErrorResponse) -> anyhow::Error {
    anyhow!("{}: {}", error.code, error.message)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RelayConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RelayConfig::default(),
    };
    init_logging(&config.logging.filter)?;

    match cli.command {
        Commands::Record { surface, output } => record(&config, surface, output).await,
        Commands::ListDevices => {
            let devices = system::list_devices().await;
            println!("{}", serde_json::to_string_pretty(&devices)?);
            Ok(())
        }
    }
}

async fn record(
    config: &RelayConfig,
    surface: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let devices = NativeMediaDevices::new(&config.capture);
    let relay = CaptureRelay::new(Arc::new(devices))
        .with_object_urls(ObjectUrlStore::new(config.artifacts.origin.clone()));
    relay.surfaces().register(surface.clone());

    let (bridge, mut notifications) = ChannelBridge::new();
    let state = RelayState::new(relay, Arc::new(bridge));

    recording::enable_camera(&state, surface, config.recorder_options())
        .await
        .map_err(command_error)?;
    recording::start_recording(&state).await.map_err(command_error)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            notification = notifications.recv() => {
                let Some(notification) = notification else {
                    return Err(anyhow!("recorder closed without stopping"));
                };
                println!("{}", serde_json::to_string(&notification)?);

                match notification {
                    HostNotification::RecordingStopped(media) => {
                        if let Some(path) = &output {
                            let blob = state
                                .object_urls()
                                .resolve(&media.object_url)
                                .ok_or_else(|| anyhow!("artifact {} is gone", media.object_url))?;
                            tokio::fs::write(path, blob.bytes()).await?;
                            tracing::info!("Wrote {} bytes to {}", blob.size(), path.display());
                        }
                        state.object_urls().revoke_object_url(&media.object_url);
                        return Ok(());
                    }
                    HostNotification::RecordingError(failure) => {
                        return Err(anyhow!(
                            "recording failed ({}): {}",
                            failure.code,
                            failure.message
                        ));
                    }
                    _ => {}
                }
            }
            line = lines.next_line(), if stdin_open => {
                let result = match line?.as_deref().map(str::trim) {
                    Some("pause") => recording::pause_recording(&state).await,
                    Some("resume") => recording::resume_recording(&state).await,
                    Some("stop") => recording::stop_recording(&state).await,
                    Some("") => Ok(()),
                    Some(other) => {
                        eprintln!("unknown command '{other}', expected pause, resume or stop");
                        Ok(())
                    }
                    None => {
                        stdin_open = false;
                        recording::stop_recording(&state).await
                    }
                };
                if let Err(e) = result {
                    eprintln!("{}: {}", e.code, e.message);
                }
            }
        }
    }
}
