use std::path::PathBuf;

/// Errors raised by the telemetry channel.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("channel is not connected")]
    NotConnected,

    #[error("malformed message from simulator: {0}")]
    Protocol(String),

    #[error("failed to decode camera image ({width}x{height}, {len} bytes)")]
    ImageDecode {
        width: u32,
        height: u32,
        len: usize,
    },

    #[error("I/O error on telemetry channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error on telemetry channel: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while reading training records.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read file list {path}: {source}")]
    FileListRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file list {0} names no record files")]
    EmptyFileList(PathBuf),

    #[error("failed to read record file {path}: {source}")]
    RecordRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse record in {path}: {source}")]
    RecordParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("record in {path} carries {len} pixel bytes, expected {expected} for {width}x{height}")]
    PixelShape {
        path: PathBuf,
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}

/// Errors raised by the steering model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to load model weights: {0}")]
    WeightsLoad(String),

    #[error("failed to save model weights: {0}")]
    WeightsSave(String),

    #[error("model input has {got} values, expected {expected}")]
    InputShape { got: usize, expected: usize },
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("failed to write summary log: {0}")]
    Summary(std::io::Error),
}

/// Errors raised by the live control loop.
#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error("telemetry channel failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
