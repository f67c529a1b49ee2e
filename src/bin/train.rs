#![recursion_limit = "256"]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use simdriver::config::AppConfig;
use simdriver::data::{read_file_list, DataSource, JsonlRecordReader};
use simdriver::training::Trainer;

/// Train the steering network from recorded driving sessions.
#[derive(Parser)]
#[command(name = "train", about = "Train the steering network")]
struct Cli {
    /// Newline-delimited list of record files
    #[arg(long = "input_list")]
    input_list: Option<PathBuf>,

    /// Validation record file
    #[arg(long = "input_val")]
    input_val: Option<PathBuf>,

    /// Accelerator selector (-1 for CPU)
    #[arg(long)]
    gpu: Option<i64>,

    /// Checkpoint directory to resume from
    #[arg(long = "checkpoint_dir")]
    checkpoint_dir: Option<PathBuf>,

    /// Summary log directory
    #[arg(long)]
    logdir: Option<PathBuf>,

    /// Checkpoint save directory
    #[arg(long)]
    savedir: Option<PathBuf>,

    /// Number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Batch size
    #[arg(long)]
    batch: Option<usize>,

    /// Initial learning rate
    #[arg(long = "learning_rate")]
    learning_rate: Option<f64>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .training;

    // Apply CLI overrides
    if let Some(input_list) = cli.input_list {
        config.input_list = input_list;
    }
    if let Some(input_val) = cli.input_val {
        config.input_val = Some(input_val);
    }
    if let Some(gpu) = cli.gpu {
        config.gpu = gpu;
    }
    if let Some(checkpoint_dir) = cli.checkpoint_dir {
        config.checkpoint_dir = Some(checkpoint_dir);
    }
    if let Some(logdir) = cli.logdir {
        config.logdir = logdir;
    }
    if let Some(savedir) = cli.savedir {
        config.savedir = savedir;
    }
    if let Some(epochs) = cli.epochs {
        config.epochs = epochs;
    }
    if let Some(batch) = cli.batch {
        config.batch = batch;
    }
    if let Some(learning_rate) = cli.learning_rate {
        config.learning_rate = learning_rate;
    }
    config.validate()?;

    let files = read_file_list(&config.input_list)
        .with_context(|| format!("reading file list {}", config.input_list.display()))?;
    println!("Training on {} record files", files.len());

    let reader = Arc::new(JsonlRecordReader::new(config.top_crop));
    let mut source = DataSource::spawn(
        files,
        reader,
        config.epochs,
        config.batch,
        config.workers,
        config.queue_depth,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("installing interrupt handler")?;

    let mut trainer = Trainer::new(config)?;
    let report = trainer.train(&mut source, &shutdown)?;

    println!(
        "Training finished: {} steps (global step {})",
        report.steps, report.global_step
    );
    Ok(())
}
