use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::TrainingError;

/// One periodic observability record, appended per training step.
///
/// The loss here is evaluated with dropout disabled so the logged numbers
/// are not distorted by regularization noise.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SummaryRecord {
    pub step: usize,
    pub global_step: usize,
    pub loss: f32,
    pub learning_rate: f64,
    pub elapsed_secs: f64,
}

/// Appends summary records as JSON lines under the log directory.
pub struct SummaryWriter {
    writer: BufWriter<fs::File>,
    path: PathBuf,
}

impl SummaryWriter {
    /// Open (or create) the summary log under `logdir`, creating the
    /// directory if absent.
    pub fn create(logdir: &Path) -> Result<Self, TrainingError> {
        fs::create_dir_all(logdir).map_err(TrainingError::Summary)?;
        let path = logdir.join("training_summary.jsonl");
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(TrainingError::Summary)?;
        Ok(SummaryWriter {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn append(&mut self, record: &SummaryRecord) -> Result<(), TrainingError> {
        let line = serde_json::to_string(record)
            .map_err(|e| TrainingError::Summary(std::io::Error::other(e)))?;
        writeln!(self.writer, "{line}").map_err(TrainingError::Summary)?;
        self.writer.flush().map_err(TrainingError::Summary)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_parseable_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logdir = dir.path().join("logs");

        let mut writer = SummaryWriter::create(&logdir).unwrap();
        for step in 0..2 {
            writer
                .append(&SummaryRecord {
                    step,
                    global_step: step + 10,
                    loss: 0.5,
                    learning_rate: 1e-4,
                    elapsed_secs: 0.01,
                })
                .unwrap();
        }

        let content = fs::read_to_string(writer.path()).unwrap();
        let records: Vec<SummaryRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].step, 1);
        assert_eq!(records[1].global_step, 11);
    }

    #[test]
    fn test_create_makes_the_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logdir = dir.path().join("deep").join("logs");
        let writer = SummaryWriter::create(&logdir).unwrap();
        assert!(logdir.is_dir());
        assert!(writer.path().starts_with(&logdir));
    }
}
