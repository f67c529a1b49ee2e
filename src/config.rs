use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub drive: DriveConfig,
    pub training: TrainConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            drive: DriveConfig::default(),
            training: TrainConfig::default(),
        }
    }
}

/// Configuration for the live control loop.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Simulator server address.
    pub ip: String,
    /// Simulator TCP port.
    pub port: u16,
    /// Directory holding the trained steering model weights.
    pub model: PathBuf,
    /// Accelerator selector; -1 runs on CPU.
    pub gpu: i64,
    /// Number of bottom image rows kept before resizing (drops the horizon).
    pub top_crop: u32,
    /// Constant throttle sent with every steering command.
    pub throttle: f32,
    /// Minimum spacing between command cycles, in milliseconds.
    pub cycle_ms: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            ip: "127.0.0.1".to_string(),
            port: 50007,
            model: PathBuf::from("save/model-0"),
            gpu: -1,
            top_crop: 130,
            throttle: 0.5,
            cycle_ms: 50,
        }
    }
}

/// Configuration for the training controller.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Newline-delimited list of record file paths.
    pub input_list: PathBuf,
    /// Validation record file. Accepted on the CLI but currently unused.
    pub input_val: Option<PathBuf>,
    /// Accelerator selector; -1 runs on CPU.
    pub gpu: i64,
    /// Checkpoint directory to resume from. Restore failure is fatal.
    pub checkpoint_dir: Option<PathBuf>,
    /// Directory for periodic summary records.
    pub logdir: PathBuf,
    /// Directory where checkpoints are written.
    pub savedir: PathBuf,
    pub epochs: usize,
    pub batch: usize,
    pub learning_rate: f64,
    /// L2 penalty weight added to the MSE loss.
    pub l2_scale: f64,
    /// Steps between learning-rate decays.
    pub lr_decay_steps: usize,
    /// Multiplier applied at each decay boundary.
    pub lr_decay_rate: f64,
    /// Steps between stdout progress lines.
    pub log_interval: usize,
    /// Steps between periodic checkpoints.
    pub checkpoint_interval: usize,
    /// Number of background record-reading workers.
    pub workers: usize,
    /// Bound on the batch queue between workers and the control thread.
    pub queue_depth: usize,
    /// Dropout probability applied between fully connected layers.
    pub dropout: f64,
    /// Number of bottom image rows kept when preprocessing recorded frames.
    pub top_crop: u32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            input_list: PathBuf::from("FileList.txt"),
            input_val: None,
            gpu: -1,
            checkpoint_dir: None,
            logdir: PathBuf::from("./logs"),
            savedir: PathBuf::from("./save"),
            epochs: 600,
            batch: 400,
            learning_rate: 1e-4,
            l2_scale: 1e-3,
            lr_decay_steps: 1000,
            lr_decay_rate: 0.9,
            log_interval: 100,
            checkpoint_interval: 1000,
            workers: 2,
            queue_depth: 8,
            dropout: 0.2,
            top_crop: 130,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drive.validate()?;
        self.training.validate()
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_crop == 0 {
            return Err(ConfigError::Validation("drive.top_crop must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.throttle) {
            return Err(ConfigError::Validation(
                "drive.throttle must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "training.learning_rate must be > 0".into(),
            ));
        }
        if self.batch == 0 {
            return Err(ConfigError::Validation("training.batch must be > 0".into()));
        }
        if self.epochs == 0 {
            return Err(ConfigError::Validation(
                "training.epochs must be > 0".into(),
            ));
        }
        if self.lr_decay_steps == 0 {
            return Err(ConfigError::Validation(
                "training.lr_decay_steps must be > 0".into(),
            ));
        }
        if !(0.0 < self.lr_decay_rate && self.lr_decay_rate <= 1.0) {
            return Err(ConfigError::Validation(
                "training.lr_decay_rate must be in (0, 1]".into(),
            ));
        }
        if self.log_interval == 0 {
            return Err(ConfigError::Validation(
                "training.log_interval must be > 0".into(),
            ));
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::Validation(
                "training.checkpoint_interval must be > 0".into(),
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::Validation(
                "training.workers must be > 0".into(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Validation(
                "training.queue_depth must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::Validation(
                "training.dropout must be in [0, 1)".into(),
            ));
        }
        if self.top_crop == 0 {
            return Err(ConfigError::Validation(
                "training.top_crop must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_defaults_match_cli_contract() {
        let config = AppConfig::default();
        assert_eq!(config.drive.ip, "127.0.0.1");
        assert_eq!(config.drive.port, 50007);
        assert_eq!(config.drive.model, PathBuf::from("save/model-0"));
        assert_eq!(config.drive.gpu, -1);
        assert_eq!(config.drive.top_crop, 130);
        assert_eq!(config.training.input_list, PathBuf::from("FileList.txt"));
        assert_eq!(config.training.logdir, PathBuf::from("./logs"));
        assert_eq!(config.training.savedir, PathBuf::from("./save"));
        assert_eq!(config.training.epochs, 600);
        assert_eq!(config.training.batch, 400);
        assert_eq!(config.training.learning_rate, 1e-4);
    }

    #[test]
    fn test_rejects_zero_learning_rate() {
        let mut config = AppConfig::default();
        config.training.learning_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_top_crop() {
        let mut config = AppConfig::default();
        config.drive.top_crop = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_full_dropout() {
        let mut config = AppConfig::default();
        config.training.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_loads_partial_toml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[training]\nbatch = 32\nlearning_rate = 0.001\n\n[drive]\nport = 6000\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.batch, 32);
        assert_eq!(config.training.learning_rate, 0.001);
        assert_eq!(config.drive.port, 6000);
        // Untouched fields keep their defaults.
        assert_eq!(config.training.epochs, 600);
        assert_eq!(config.drive.top_crop, 130);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.training.batch, 400);
    }
}
