use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use burn::module::Module;
use burn::record::DefaultRecorder;

use crate::checkpoint::metadata::{CheckpointMetadata, TrainingRunState};
use crate::error::CheckpointError;
use crate::model::{DriverNetwork, InferenceBackend};

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("save"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// Checkpoint contents minus the model weights, which live in `model.mpk`
/// next to the metadata.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub run_state: TrainingRunState,
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        fs::create_dir_all(&config.checkpoint_dir).ok();
        CheckpointManager { config }
    }

    /// Save a checkpoint: model weights, run state, and metadata, written to
    /// a temp directory and renamed into place.
    pub fn save_checkpoint(
        &self,
        network: DriverNetwork<InferenceBackend>,
        metadata: &CheckpointMetadata,
        run_state: &TrainingRunState,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", metadata.global_step);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        network
            .save_file(tmp_dir.join("model"), &DefaultRecorder::default())
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;

        let state_json = serde_json::to_string_pretty(run_state)?;
        fs::write(tmp_dir.join("training_state.json"), state_json)?;

        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(tmp_dir.join("metadata.json"), meta_json)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints()?;

        Ok(final_dir)
    }

    /// Load metadata and run state from an explicit checkpoint directory.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }

        let meta_path = dir.join("metadata.json");
        let state_path = dir.join("training_state.json");

        let meta_json = fs::read_to_string(&meta_path).map_err(|e| {
            CheckpointError::MetadataRead {
                path: meta_path.clone(),
                source: e,
            }
        })?;
        let metadata: CheckpointMetadata =
            serde_json::from_str(&meta_json).map_err(|e| CheckpointError::MetadataParse {
                path: meta_path,
                source: e,
            })?;

        let state_json =
            fs::read_to_string(&state_path).map_err(|e| CheckpointError::MetadataRead {
                path: state_path.clone(),
                source: e,
            })?;
        let run_state: TrainingRunState =
            serde_json::from_str(&state_json).map_err(|e| CheckpointError::MetadataParse {
                path: state_path,
                source: e,
            })?;

        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            run_state,
        })
    }

    /// Load the checkpoint the `latest` symlink points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join("latest");
        if !latest_link.exists() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load_checkpoint(&target)
    }

    /// List all checkpoints sorted by global step (ascending).
    pub fn list_checkpoints(
        &self,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join("metadata.json");
            if meta_path.exists() {
                let meta_json = fs::read_to_string(&meta_path).map_err(|e| {
                    CheckpointError::MetadataRead {
                        path: meta_path.clone(),
                        source: e,
                    }
                })?;
                let metadata: CheckpointMetadata = serde_json::from_str(&meta_json).map_err(
                    |e| CheckpointError::MetadataParse {
                        path: meta_path,
                        source: e,
                    },
                )?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.global_step);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and the best N
    /// by lowest loss.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: std::collections::HashSet<usize> = (total
            .saturating_sub(self.config.keep_last_n)..total)
            .collect();

        let mut by_loss: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.loss))
            .collect();
        by_loss.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        for (i, _) in by_loss.iter().take(self.config.keep_best_n) {
            keep.insert(*i);
        }

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Update the `latest` symlink to point to the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join("latest");
        if link_path.exists() || link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

/// Seconds since the epoch, for checkpoint metadata.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
