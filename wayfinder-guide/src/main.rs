// Wayfinder - spoken obstacle guidance from a camera feed

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wayfinder_eye::camera::ImageSequenceSource;
use wayfinder_eye::models::ReplayEngine;
use wayfinder_eye::render::TracingRenderer;
use wayfinder_guide::{
    haptics_for, speech_engine_for, Collaborators, FrameLoop, GuideConfig, GuideStatus, Pipeline, StatusChannel,
    StopReason,
};

#[derive(Parser)]
#[command(name = "wayfinder")]
#[command(about = "Speaks out nearby obstacles seen by a camera", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the per-user config if present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG wins when set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the guide on recorded frames and engine outputs
    Run {
        /// Directory of camera frames, played in file-name order
        #[arg(long)]
        frames: PathBuf,

        /// Directory of recorded inference outputs (.bin or .json)
        #[arg(long)]
        recordings: PathBuf,

        /// Start over when the frames run out
        #[arg(long = "loop")]
        looping: bool,
    },

    /// Validate the configuration and print the effective values
    CheckConfig,
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json);

    let config = GuideConfig::discover(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::CheckConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Run {
            frames,
            recordings,
            looping,
        } => run(config, frames, recordings, looping).await,
    }
}

async fn run(config: GuideConfig, frames: PathBuf, recordings: PathBuf, looping: bool) -> anyhow::Result<()> {
    let status = Arc::new(StatusChannel::new());
    let mut updates = status.subscribe();
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            match &update.status {
                GuideStatus::CameraUnavailable(_) | GuideStatus::SpeechUnavailable(_) => {
                    warn!("Status: {:?} at {}", update.status, update.at)
                }
                _ => info!("Status: {:?} at {}", update.status, update.at),
            }
        }
    });
    status.publish(GuideStatus::Starting);

    let camera = ImageSequenceSource::open(&frames, looping)
        .with_context(|| format!("Cannot open frames in {}", frames.display()))?;
    let inference = ReplayEngine::open(&recordings)
        .with_context(|| format!("Cannot open recordings in {}", recordings.display()))?;

    let parts = Collaborators {
        camera: Box::new(camera),
        inference: Arc::new(inference),
        renderer: Box::new(TracingRenderer::new()),
        speech: speech_engine_for(&config.speech, &status),
        haptics: haptics_for(&config.speech),
    };
    let pipeline = Pipeline::new(&config, parts)?;

    let handle = FrameLoop::spawn(pipeline, config.scheduling.clone(), status.clone());

    let stopper = handle.stopper();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            stopper.stop();
        }
    });

    let summary = handle.join().await?;
    info!(
        "Session over: {} passes, {} alerts, {} frames skipped",
        summary.passes, summary.alerts, summary.skipped
    );

    match summary.reason {
        StopReason::Fatal(reason) => {
            error!("Stopped on error: {}", reason);
            anyhow::bail!(reason)
        }
        StopReason::Requested | StopReason::EndOfStream => Ok(()),
    }
}
