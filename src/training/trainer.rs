use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::TensorData;

use crate::checkpoint::{
    unix_timestamp, CheckpointHyperparameters, CheckpointManager, CheckpointManagerConfig,
    CheckpointMetadata, CheckpointMetrics, TrainingRunState,
};
use crate::config::TrainConfig;
use crate::data::{Batch, BatchSource};
use crate::error::{CheckpointError, TrainingError};
use crate::model::{device_for, DriverNetwork, DriverNetworkConfig, InferenceBackend, TrainBackend};
use crate::training::schedule::LrSchedule;
use crate::training::summary::{SummaryRecord, SummaryWriter};
use crate::vision::{INPUT_HEIGHT, INPUT_WIDTH};

/// Outcome of a completed (or interrupted) training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Steps executed by this run.
    pub steps: usize,
    /// Optimizer step counter including any restored offset.
    pub global_step: usize,
    /// Last evaluated loss, if at least one step ran.
    pub final_loss: Option<f32>,
}

/// The training controller: drives batches from a [`BatchSource`] through
/// optimization steps until the source is exhausted or the shutdown flag is
/// raised, then stops the source's workers and, if any step ran, writes a
/// final checkpoint.
///
/// Each step optimizes with dropout active on the autodiff backend; the loss
/// written to the summary sink is re-evaluated on the plain backend with
/// dropout disabled.
pub struct Trainer {
    config: TrainConfig,
    device: <InferenceBackend as Backend>::Device,
    network: DriverNetwork<TrainBackend>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<
        burn::optim::Adam,
        DriverNetwork<TrainBackend>,
        TrainBackend,
    >,
    schedule: LrSchedule,
    summary: SummaryWriter,
    manager: CheckpointManager,
    state: TrainingRunState,
}

impl Trainer {
    /// Build the controller: model, optimizer, schedule, log and save
    /// directories, and — if one was requested — the restored checkpoint.
    /// Restore failure is fatal; there is no fallback to fresh weights.
    pub fn new(config: TrainConfig) -> Result<Self, TrainingError> {
        let device = device_for(config.gpu);
        let mut network = DriverNetworkConfig::new()
            .with_dropout(config.dropout)
            .init::<TrainBackend>(&device);

        let manager = CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: config.savedir.clone(),
            ..Default::default()
        });

        let mut state = TrainingRunState::default();
        if let Some(dir) = &config.checkpoint_dir {
            println!("Loading pre-trained model: {}", dir.display());
            let data = manager.load_checkpoint(dir)?;
            network = network
                .load_file(dir.join("model"), &DefaultRecorder::default(), &device)
                .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
            state.global_step = data.run_state.global_step;
            state.restored_from_checkpoint = true;
        }

        let summary = SummaryWriter::create(&config.logdir)?;
        let schedule = LrSchedule::new(
            config.learning_rate,
            config.lr_decay_steps,
            config.lr_decay_rate,
        );

        Ok(Trainer {
            device,
            network,
            optimizer: AdamConfig::new().init(),
            schedule,
            summary,
            manager,
            state,
            config,
        })
    }

    pub fn run_state(&self) -> &TrainingRunState {
        &self.state
    }

    /// Run the training loop until `source` is exhausted or `shutdown` is
    /// raised. Stops the source's background workers before returning on
    /// every path, including step failures, and writes a final checkpoint
    /// whenever at least one step ran.
    pub fn train(
        &mut self,
        source: &mut dyn BatchSource,
        shutdown: &AtomicBool,
    ) -> Result<TrainingReport, TrainingError> {
        let mut final_loss = None;
        let outcome = self.run_loop(source, shutdown, &mut final_loss);

        // Orderly shutdown: no step runs concurrently with worker teardown,
        // and no worker survives past this call, even on a failed step.
        source.shutdown();
        outcome?;

        // A zero-step run changed nothing since init or restore; there is no
        // loss to publish and no checkpoint to write.
        if let Some(loss) = final_loss {
            self.save_checkpoint(loss)?;
        }

        Ok(TrainingReport {
            steps: self.state.step,
            global_step: self.state.global_step,
            final_loss,
        })
    }

    fn run_loop(
        &mut self,
        source: &mut dyn BatchSource,
        shutdown: &AtomicBool,
        final_loss: &mut Option<f32>,
    ) -> Result<(), TrainingError> {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            let Some(batch) = source.next_batch() else {
                // Normal termination: every configured epoch consumed.
                return Ok(());
            };

            let start = Instant::now();
            let learning_rate = self.schedule.lr_at(self.state.global_step);
            let (train_loss, eval_loss) = self.step(&batch, learning_rate);
            self.state.global_step += 1;
            let elapsed = start.elapsed().as_secs_f64();

            if self.is_log_step(self.state.step) {
                println!(
                    "Step {}: loss = {:.2} ({:.3} sec)",
                    self.state.step, train_loss, elapsed
                );
            }

            self.summary.append(&SummaryRecord {
                step: self.state.step,
                global_step: self.state.global_step,
                loss: eval_loss,
                learning_rate,
                elapsed_secs: elapsed,
            })?;

            if self.state.global_step % self.config.checkpoint_interval == 0 {
                let path = self.save_checkpoint(eval_loss)?;
                println!("  >> Checkpoint saved: {}", path.display());
            }

            *final_loss = Some(eval_loss);
            self.state.step += 1;
        }
    }

    /// Diagnostics print on the first step of a run and every
    /// `log_interval` steps thereafter.
    fn is_log_step(&self, step: usize) -> bool {
        step % self.config.log_interval == 0
    }

    /// One optimization step. Returns the regularized training loss and the
    /// dropout-free evaluation loss for logging.
    fn step(&mut self, batch: &Batch, learning_rate: f64) -> (f32, f32) {
        let inputs = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(batch.inputs.as_slice()),
            &self.device,
        )
        .reshape([
            batch.len as i32,
            3,
            INPUT_HEIGHT as i32,
            INPUT_WIDTH as i32,
        ]);
        let targets = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(batch.targets.as_slice()),
            &self.device,
        )
        .reshape([batch.len as i32, 1]);

        // MSE plus the L2 penalty over all trainable parameters, dropout on.
        let predictions = self.network.forward(inputs);
        let diff = predictions - targets;
        let mse = (diff.clone() * diff).mean();
        let loss = mse + self.network.l2_penalty() * self.config.l2_scale;

        let train_loss: f32 = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0];

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.network);
        self.network = self
            .optimizer
            .step(learning_rate, self.network.clone(), grads);

        (train_loss, self.eval_loss(batch))
    }

    /// Plain MSE on the inference backend; dropout does not fire here.
    fn eval_loss(&self, batch: &Batch) -> f32 {
        let inputs = Tensor::<InferenceBackend, 1>::from_data(
            TensorData::from(batch.inputs.as_slice()),
            &self.device,
        )
        .reshape([
            batch.len as i32,
            3,
            INPUT_HEIGHT as i32,
            INPUT_WIDTH as i32,
        ]);
        let targets = Tensor::<InferenceBackend, 1>::from_data(
            TensorData::from(batch.targets.as_slice()),
            &self.device,
        )
        .reshape([batch.len as i32, 1]);

        let predictions = self.network.valid().forward(inputs);
        let diff = predictions - targets;
        let mse = (diff.clone() * diff).mean();
        mse.into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0]
    }

    fn save_checkpoint(&self, loss: f32) -> Result<std::path::PathBuf, TrainingError> {
        let metadata = CheckpointMetadata {
            global_step: self.state.global_step,
            timestamp: unix_timestamp(),
            metrics: CheckpointMetrics {
                loss,
                learning_rate: self.schedule.lr_at(self.state.global_step),
            },
            hyperparameters: CheckpointHyperparameters {
                learning_rate: self.config.learning_rate,
                batch_size: self.config.batch,
                epochs: self.config.epochs,
                l2_scale: self.config.l2_scale,
                lr_decay_steps: self.config.lr_decay_steps,
                lr_decay_rate: self.config.lr_decay_rate,
                dropout: self.config.dropout,
            },
        };
        let path = self
            .manager
            .save_checkpoint(self.network.valid(), &metadata, &self.state)?;
        Ok(path)
    }
}
