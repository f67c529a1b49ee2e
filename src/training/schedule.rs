/// Staircase learning-rate schedule.
///
/// The rate is multiplied by `decay_rate` at every `decay_steps` boundary:
/// `lr(s) = initial * decay_rate^floor(s / decay_steps)`. It is derived from
/// the global step on demand and never stored.
#[derive(Debug, Clone)]
pub struct LrSchedule {
    initial: f64,
    decay_steps: usize,
    decay_rate: f64,
}

impl LrSchedule {
    pub fn new(initial: f64, decay_steps: usize, decay_rate: f64) -> Self {
        LrSchedule {
            initial,
            decay_steps,
            decay_rate,
        }
    }

    pub fn lr_at(&self, global_step: usize) -> f64 {
        let decays = (global_step / self.decay_steps) as i32;
        self.initial * self.decay_rate.powi(decays)
    }
}
