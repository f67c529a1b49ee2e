use serde::{Deserialize, Serialize};

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub loss: f32,
    pub learning_rate: f64,
}

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointHyperparameters {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub l2_scale: f64,
    pub lr_decay_steps: usize,
    pub lr_decay_rate: f64,
    pub dropout: f64,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub global_step: usize,
    pub timestamp: u64,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: CheckpointHyperparameters,
}

/// Training controller state written to training_state.json.
///
/// The learning rate is never stored here; it is always derived from
/// `global_step` by the schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingRunState {
    /// Steps executed by this controller run.
    pub step: usize,
    /// Optimizer step counter across all runs.
    pub global_step: usize,
    /// Whether this run started from a restored checkpoint.
    #[serde(default)]
    pub restored_from_checkpoint: bool,
}
