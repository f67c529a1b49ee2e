#![recursion_limit = "256"]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use simdriver::config::AppConfig;
use simdriver::model::SteeringModel;
use simdriver::pilot::GamePilot;
use simdriver::telemetry::{GameTelemetry, TelemetryChannel};

/// Drive inside the game with a trained steering model.
#[derive(Parser)]
#[command(name = "drive", about = "Drive inside the game")]
struct Cli {
    /// Simulator server IP address
    #[arg(long)]
    ip: Option<String>,

    /// Simulator TCP port
    #[arg(long)]
    port: Option<u16>,

    /// Trained driver model checkpoint directory
    #[arg(long)]
    model: Option<PathBuf>,

    /// Accelerator selector (-1 for CPU)
    #[arg(long)]
    gpu: Option<i64>,

    /// Bottom rows kept when cropping, to avoid the horizon
    #[arg(long = "top_crop")]
    top_crop: Option<u32>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .drive;

    // Apply CLI overrides
    if let Some(ip) = cli.ip {
        config.ip = ip;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(gpu) = cli.gpu {
        config.gpu = gpu;
    }
    if let Some(top_crop) = cli.top_crop {
        config.top_crop = top_crop;
    }
    config.validate()?;

    println!("Loading model: {}", config.model.display());
    let model = SteeringModel::load(&config.model, config.gpu)
        .with_context(|| format!("loading model from {}", config.model.display()))?;

    println!("Connecting to {}:{}", config.ip, config.port);
    let mut channel = GameTelemetry::new(&config.ip, config.port);
    channel
        .connect()
        .context("connecting to the simulator")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("installing interrupt handler")?;

    let mut pilot = GamePilot::new(channel, model, config);
    pilot.run(&shutdown)?;
    Ok(())
}
