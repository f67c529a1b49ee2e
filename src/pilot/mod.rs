//! The live control loop: telemetry in, steering commands out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::DriveConfig;
use crate::error::PilotError;
use crate::model::SteeringPredictor;
use crate::telemetry::{Command, GameRecord, TelemetryChannel};
use crate::vision;

/// Drives the simulator: one steering command per valid sensor sample, at a
/// bounded rate, until the shutdown flag is raised.
///
/// Every iteration is identical: fetch telemetry and a camera frame, skip the
/// cycle if either is missing, otherwise preprocess, predict, and send
/// `[steering, throttle]`. Throttle is a constant; the channel decides how
/// commands are framed. A send failure is fatal and propagates.
pub struct GamePilot<C: TelemetryChannel, M: SteeringPredictor> {
    channel: C,
    model: M,
    config: DriveConfig,
    next_record_id: u64,
    last_record: Option<GameRecord>,
}

impl<C: TelemetryChannel, M: SteeringPredictor> GamePilot<C, M> {
    pub fn new(channel: C, model: M, config: DriveConfig) -> Self {
        GamePilot {
            channel,
            model,
            config,
            next_record_id: 0,
            last_record: None,
        }
    }

    /// Run until `shutdown` is raised. Exits cleanly without sending a final
    /// command; missing telemetry or image skips the cycle with no delay.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), PilotError> {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }

            let telemetry = self.channel.game_data()?;
            let image = self.channel.image()?;
            let (Some(telemetry), Some(image)) = (telemetry, image) else {
                continue;
            };

            // Rate limiter, not a correctness requirement: keeps the command
            // stream from saturating the channel.
            thread::sleep(Duration::from_millis(self.config.cycle_ms));

            let record = GameRecord::new(self.next_record_id, image, telemetry);
            self.next_record_id += 1;

            let input = vision::preprocess(record.image(), self.config.top_crop);
            let steering = self.model.predict(&input)?;
            println!("{steering}");

            self.channel.send_command(&Command {
                steering,
                throttle: self.config.throttle,
            })?;
            self.last_record = Some(record);
        }
    }

    /// The most recent acquired sample, if any cycle has completed.
    pub fn last_record(&self) -> Option<&GameRecord> {
        self.last_record.as_ref()
    }
}
