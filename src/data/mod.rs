mod source;

pub use source::DataSource;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DataError;
use crate::telemetry::CameraImage;
use crate::vision;

/// One training example: preprocessed model input plus its steering label.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    /// CHW float buffer, exactly [`vision::INPUT_LEN`] values in [0, 1].
    pub input: Vec<f32>,
    pub steering: f32,
}

/// A packed batch of training examples ready for the model.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Concatenated inputs, `len * INPUT_LEN` values.
    pub inputs: Vec<f32>,
    /// Steering labels, `len` values.
    pub targets: Vec<f32>,
    pub len: usize,
}

/// An ordered, possibly finite, batched stream of training examples.
///
/// `next_batch` returns `None` once the stream is exhausted or shut down;
/// `shutdown` stops any background feeding and joins it before returning.
pub trait BatchSource {
    fn next_batch(&mut self) -> Option<Batch>;

    fn shutdown(&mut self);
}

/// Read a newline-delimited list of record file paths. Blank lines are
/// skipped; an empty result is an error.
pub fn read_file_list(path: &Path) -> Result<Vec<PathBuf>, DataError> {
    let content = fs::read_to_string(path).map_err(|e| DataError::FileListRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let files: Vec<PathBuf> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    if files.is_empty() {
        return Err(DataError::EmptyFileList(path.to_path_buf()));
    }
    Ok(files)
}

/// Reads every example out of one recorded-session file.
pub trait RecordReader: Send + Sync {
    fn read_records(&self, path: &Path) -> Result<Vec<TrainingExample>, DataError>;
}

/// A recorded frame as stored on disk: raw RGB bytes plus the steering label.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct DrivingRecord {
    pub steering: f32,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Record reader for JSON-lines session files. Each record's frame runs
/// through the same preprocessing as the live loop.
pub struct JsonlRecordReader {
    top_crop: u32,
}

impl JsonlRecordReader {
    pub fn new(top_crop: u32) -> Self {
        JsonlRecordReader { top_crop }
    }
}

impl RecordReader for JsonlRecordReader {
    fn read_records(&self, path: &Path) -> Result<Vec<TrainingExample>, DataError> {
        let content = fs::read_to_string(path).map_err(|e| DataError::RecordRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut examples = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let record: DrivingRecord =
                serde_json::from_str(line).map_err(|e| DataError::RecordParse {
                    path: path.to_path_buf(),
                    source: e,
                })?;

            let expected = (record.width * record.height * 3) as usize;
            if record.pixels.len() != expected {
                return Err(DataError::PixelShape {
                    path: path.to_path_buf(),
                    len: record.pixels.len(),
                    expected,
                    width: record.width,
                    height: record.height,
                });
            }
            let image = CameraImage::from_raw(record.width, record.height, record.pixels)
                .expect("pixel length checked above");

            examples.push(TrainingExample {
                input: vision::preprocess(&image, self.top_crop),
                steering: record.steering,
            });
        }
        Ok(examples)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::io::Write;

    /// Write a JSONL record file with `count` gray 8x8 frames and ascending
    /// steering labels starting at `base`.
    pub fn write_record_file(path: &Path, count: usize, base: f32) {
        let mut file = fs::File::create(path).unwrap();
        for i in 0..count {
            let record = DrivingRecord {
                steering: base + i as f32,
                width: 8,
                height: 8,
                pixels: vec![100; 8 * 8 * 3],
            };
            writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("FileList.txt");
        fs::write(&list, "a.jsonl\n\n  \nb.jsonl\n").unwrap();

        let files = read_file_list(&list).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.jsonl"), PathBuf::from("b.jsonl")]);
    }

    #[test]
    fn test_empty_file_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("FileList.txt");
        fs::write(&list, "\n\n").unwrap();

        assert!(matches!(
            read_file_list(&list),
            Err(DataError::EmptyFileList(_))
        ));
    }

    #[test]
    fn test_reads_examples_with_preprocessed_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        test_support::write_record_file(&path, 3, 0.5);

        let reader = JsonlRecordReader::new(130);
        let examples = reader.read_records(&path).unwrap();

        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0].steering, 0.5);
        assert_eq!(examples[2].steering, 2.5);
        for example in &examples {
            assert_eq!(example.input.len(), vision::INPUT_LEN);
            assert!(example.input.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_rejects_bad_pixel_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        let record = DrivingRecord {
            steering: 0.0,
            width: 8,
            height: 8,
            pixels: vec![0; 7],
        };
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();

        let reader = JsonlRecordReader::new(130);
        assert!(matches!(
            reader.read_records(&path),
            Err(DataError::PixelShape { len: 7, .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "not json\n").unwrap();

        let reader = JsonlRecordReader::new(130);
        assert!(matches!(
            reader.read_records(&path),
            Err(DataError::RecordParse { .. })
        ));
    }
}
