mod network;

pub use network::{DriverNetwork, DriverNetworkConfig};

use std::path::Path;

use burn::module::Module;
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::TensorData;

use crate::error::ModelError;
use crate::vision::{INPUT_HEIGHT, INPUT_LEN, INPUT_WIDTH};

/// CPU inference backend. Training wraps this in autodiff.
pub type InferenceBackend = burn::backend::NdArray<f32>;
/// Autodiff backend used for optimization steps; dropout is active here.
pub type TrainBackend = burn::backend::Autodiff<InferenceBackend>;

/// Resolve the compute device for a CLI accelerator selector (-1 = CPU).
///
/// The ndarray backend runs on the CPU regardless; a non-negative selector is
/// accepted for interface compatibility and reported.
pub fn device_for(gpu: i64) -> <InferenceBackend as Backend>::Device {
    if gpu >= 0 {
        eprintln!("accelerator {gpu} requested; ndarray backend runs on CPU");
    }
    Default::default()
}

/// Anything that can turn a preprocessed frame into a steering angle.
///
/// The live loop drives this seam so tests can substitute a stub model.
pub trait SteeringPredictor {
    fn predict(&self, input: &[f32]) -> Result<f32, ModelError>;
}

/// Inference wrapper around [`DriverNetwork`] with loaded weights.
pub struct SteeringModel {
    network: DriverNetwork<InferenceBackend>,
    device: <InferenceBackend as Backend>::Device,
}

impl SteeringModel {
    /// Load trained weights from a checkpoint directory (expects `model.mpk`).
    pub fn load(dir: &Path, gpu: i64) -> Result<Self, ModelError> {
        let device = device_for(gpu);
        let network = DriverNetworkConfig::new()
            .init::<InferenceBackend>(&device)
            .load_file(dir.join("model"), &DefaultRecorder::default(), &device)
            .map_err(|e| ModelError::WeightsLoad(e.to_string()))?;
        Ok(SteeringModel { network, device })
    }

    /// Wrap an already built network (used when evaluating during training).
    pub fn from_network(
        network: DriverNetwork<InferenceBackend>,
        device: <InferenceBackend as Backend>::Device,
    ) -> Self {
        SteeringModel { network, device }
    }
}

impl SteeringPredictor for SteeringModel {
    fn predict(&self, input: &[f32]) -> Result<f32, ModelError> {
        if input.len() != INPUT_LEN {
            return Err(ModelError::InputShape {
                got: input.len(),
                expected: INPUT_LEN,
            });
        }

        let tensor = Tensor::<InferenceBackend, 1>::from_data(TensorData::from(input), &self.device)
            .reshape([1, 3, INPUT_HEIGHT as i32, INPUT_WIDTH as i32]);
        let output = self.network.forward(tensor);
        let values: Vec<f32> = output
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction");
        Ok(values[0])
    }
}
