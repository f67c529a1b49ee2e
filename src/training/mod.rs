pub mod schedule;
pub mod summary;
pub mod trainer;

pub use schedule::LrSchedule;
pub use summary::{SummaryRecord, SummaryWriter};
pub use trainer::{Trainer, TrainingReport};
