mod tcp;

pub use tcp::GameTelemetry;

use crate::error::TelemetryError;

/// A raw camera frame at the simulator's native resolution.
pub type CameraImage = image::RgbImage;

/// Vehicle state reported by the simulator once per cycle.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TelemetryFrame {
    pub speed: f32,
    pub steering: f32,
    pub throttle: f32,
}

/// A control command sent back to the simulator.
///
/// Serialized on the wire as the `[steering, throttle]` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub steering: f32,
    pub throttle: f32,
}

/// One acquired live-loop sample: sequence id, camera frame, telemetry.
///
/// Immutable once constructed; the id is a monotonically assigned sequence
/// number with no meaning beyond identification.
#[derive(Debug, Clone)]
pub struct GameRecord {
    id: u64,
    image: CameraImage,
    telemetry: TelemetryFrame,
}

impl GameRecord {
    pub fn new(id: u64, image: CameraImage, telemetry: TelemetryFrame) -> Self {
        GameRecord {
            id,
            image,
            telemetry,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &CameraImage {
        &self.image
    }

    pub fn telemetry(&self) -> &TelemetryFrame {
        &self.telemetry
    }
}

/// The channel through which telemetry, camera frames, and commands flow.
///
/// `game_data` and `image` return `Ok(None)` when the simulator has no data
/// ready yet; the caller is expected to skip that cycle. Exact wire framing
/// is the implementation's concern.
pub trait TelemetryChannel {
    fn connect(&mut self) -> Result<(), TelemetryError>;

    fn game_data(&mut self) -> Result<Option<TelemetryFrame>, TelemetryError>;

    fn image(&mut self) -> Result<Option<CameraImage>, TelemetryError>;

    fn send_command(&mut self, command: &Command) -> Result<(), TelemetryError>;
}
