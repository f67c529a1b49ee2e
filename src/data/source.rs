use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{Batch, BatchSource, RecordReader};
use crate::vision::INPUT_LEN;

/// Batched example stream fed by background worker threads.
///
/// Record files are dealt round-robin to the workers; each worker iterates
/// its share for the configured epoch count, shuffling file order per epoch,
/// and pushes packed batches into a bounded queue. A shared stop flag plus
/// the dropped receiver unblock workers on shutdown; no worker outlives
/// [`BatchSource::shutdown`].
pub struct DataSource {
    receiver: Option<Receiver<Batch>>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl DataSource {
    pub fn spawn(
        files: Vec<PathBuf>,
        reader: Arc<dyn RecordReader>,
        epochs: usize,
        batch_size: usize,
        workers: usize,
        queue_depth: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::sync_channel(queue_depth);
        let stop = Arc::new(AtomicBool::new(false));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                let files: Vec<PathBuf> = files
                    .iter()
                    .skip(worker_id)
                    .step_by(workers.max(1))
                    .cloned()
                    .collect();
                let sender = sender.clone();
                let reader = Arc::clone(&reader);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    feed_batches(worker_id, files, reader, epochs, batch_size, sender, stop)
                })
            })
            .collect();

        DataSource {
            receiver: Some(receiver),
            stop,
            workers,
        }
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // Dropping the receiver unblocks any worker stuck on a full queue.
        self.receiver = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl BatchSource for DataSource {
    fn next_batch(&mut self) -> Option<Batch> {
        if self.stop.load(Ordering::Relaxed) {
            return None;
        }
        // Err means every worker has finished and dropped its sender.
        self.receiver.as_ref()?.recv().ok()
    }

    fn shutdown(&mut self) {
        self.stop_and_join();
    }
}

impl Drop for DataSource {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn feed_batches(
    worker_id: usize,
    files: Vec<PathBuf>,
    reader: Arc<dyn RecordReader>,
    epochs: usize,
    batch_size: usize,
    sender: SyncSender<Batch>,
    stop: Arc<AtomicBool>,
) {
    let mut rng = StdRng::from_os_rng();
    let mut inputs: Vec<f32> = Vec::with_capacity(batch_size * INPUT_LEN);
    let mut targets: Vec<f32> = Vec::with_capacity(batch_size);

    for _ in 0..epochs {
        let mut order = files.clone();
        order.shuffle(&mut rng);

        for path in &order {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            let examples = match reader.read_records(path) {
                Ok(examples) => examples,
                Err(e) => {
                    eprintln!("worker {worker_id}: skipping {}: {e}", path.display());
                    continue;
                }
            };
            for example in examples {
                inputs.extend_from_slice(&example.input);
                targets.push(example.steering);
                if targets.len() == batch_size {
                    let batch = Batch {
                        inputs: std::mem::take(&mut inputs),
                        targets: std::mem::take(&mut targets),
                        len: batch_size,
                    };
                    if sender.send(batch).is_err() {
                        return;
                    }
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                }
            }
        }
    }

    // Trailing partial batch once all epochs are consumed.
    if !targets.is_empty() {
        let len = targets.len();
        let _ = sender.send(Batch {
            inputs,
            targets,
            len,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::write_record_file;
    use crate::data::JsonlRecordReader;
    use std::time::Duration;

    fn reader() -> Arc<dyn RecordReader> {
        Arc::new(JsonlRecordReader::new(130))
    }

    #[test]
    fn test_yields_all_batches_then_exhausts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_record_file(&path, 4, 0.0);

        let mut source = DataSource::spawn(vec![path], reader(), 1, 2, 1, 4);

        let first = source.next_batch().unwrap();
        assert_eq!(first.len, 2);
        assert_eq!(first.targets.len(), 2);
        assert_eq!(first.inputs.len(), 2 * INPUT_LEN);

        let second = source.next_batch().unwrap();
        assert_eq!(second.len, 2);

        assert!(source.next_batch().is_none());
    }

    #[test]
    fn test_epochs_multiply_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_record_file(&path, 2, 0.0);

        let mut source = DataSource::spawn(vec![path], reader(), 3, 2, 1, 4);

        let mut batches = 0;
        while source.next_batch().is_some() {
            batches += 1;
        }
        assert_eq!(batches, 3);
    }

    #[test]
    fn test_partial_trailing_batch_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_record_file(&path, 3, 0.0);

        let mut source = DataSource::spawn(vec![path], reader(), 1, 2, 1, 4);

        assert_eq!(source.next_batch().unwrap().len, 2);
        assert_eq!(source.next_batch().unwrap().len, 1);
        assert!(source.next_batch().is_none());
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.jsonl");
        write_record_file(&good, 2, 0.0);
        let missing = dir.path().join("missing.jsonl");

        let mut source = DataSource::spawn(vec![missing, good], reader(), 1, 2, 1, 4);

        assert_eq!(source.next_batch().unwrap().len, 2);
        assert!(source.next_batch().is_none());
    }

    #[test]
    fn test_shutdown_stops_workers_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_record_file(&path, 8, 0.0);

        // Tiny queue and many epochs keep the worker busy when we cancel.
        let mut source = DataSource::spawn(vec![path], reader(), 1000, 2, 2, 1);
        let _ = source.next_batch().unwrap();

        source.shutdown();
        assert!(source.workers.is_empty());
        assert!(source.next_batch().is_none());
    }

    #[test]
    fn test_workers_do_not_outlive_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_record_file(&path, 8, 0.0);

        let source = DataSource::spawn(vec![path], reader(), 1000, 2, 2, 1);
        std::thread::sleep(Duration::from_millis(20));
        drop(source); // must not hang on the full queue
    }
}
