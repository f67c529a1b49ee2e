use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Steering regression network.
///
/// ```text
/// Input:  [batch, 3, 66, 200]
/// Conv1:  3 -> 24 channels, 5x5 kernel, stride 2  =>  [batch, 24, 31, 98]
/// Conv2:  24 -> 36 channels, 5x5 kernel, stride 2 =>  [batch, 36, 14, 47]
/// Conv3:  36 -> 48 channels, 5x5 kernel, stride 2 =>  [batch, 48, 5, 22]
/// Conv4:  48 -> 64 channels, 3x3 kernel           =>  [batch, 64, 3, 20]
/// Conv5:  64 -> 64 channels, 3x3 kernel           =>  [batch, 64, 1, 18]
/// Flatten: 64*1*18 = 1152
/// FC1:    1152 -> 100, ReLU, dropout
/// FC2:    100 -> 50, ReLU, dropout
/// FC3:    50 -> 10, ReLU, dropout
/// FC4:    10 -> 1  (steering angle)
/// ```
///
/// Dropout only fires on the autodiff backend, so training steps regularize
/// while inference and logged evaluations stay deterministic.
#[derive(Module, Debug)]
pub struct DriverNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    conv4: Conv2d<B>,
    conv5: Conv2d<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    fc4: Linear<B>,
    relu: Relu,
    dropout: Dropout,
}

const FLATTENED: usize = 64 * 1 * 18;

#[derive(Config, Debug)]
pub struct DriverNetworkConfig {
    /// Dropout probability between the fully connected layers.
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl DriverNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DriverNetwork<B> {
        DriverNetwork {
            conv1: Conv2dConfig::new([3, 24], [5, 5])
                .with_stride([2, 2])
                .init(device),
            conv2: Conv2dConfig::new([24, 36], [5, 5])
                .with_stride([2, 2])
                .init(device),
            conv3: Conv2dConfig::new([36, 48], [5, 5])
                .with_stride([2, 2])
                .init(device),
            conv4: Conv2dConfig::new([48, 64], [3, 3]).init(device),
            conv5: Conv2dConfig::new([64, 64], [3, 3]).init(device),
            fc1: LinearConfig::new(FLATTENED, 100).init(device),
            fc2: LinearConfig::new(100, 50).init(device),
            fc3: LinearConfig::new(50, 10).init(device),
            fc4: LinearConfig::new(10, 1).init(device),
            relu: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

impl<B: Backend> DriverNetwork<B> {
    /// Forward pass: input [batch, 3, 66, 200] -> output [batch, 1] steering.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch_size = input.dims()[0];

        let x = self.relu.forward(self.conv1.forward(input));
        let x = self.relu.forward(self.conv2.forward(x));
        let x = self.relu.forward(self.conv3.forward(x));
        let x = self.relu.forward(self.conv4.forward(x));
        let x = self.relu.forward(self.conv5.forward(x));
        let x = x.reshape([batch_size as i32, FLATTENED as i32]);
        let x = self.dropout.forward(self.relu.forward(self.fc1.forward(x)));
        let x = self.dropout.forward(self.relu.forward(self.fc2.forward(x)));
        let x = self.dropout.forward(self.relu.forward(self.fc3.forward(x)));
        self.fc4.forward(x)
    }

    /// Half the sum of squared trainable parameters, kept in the graph so the
    /// penalty contributes gradients.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        let mut total = squared_sum(self.conv1.weight.val());
        total = total + squared_sum(self.conv2.weight.val());
        total = total + squared_sum(self.conv3.weight.val());
        total = total + squared_sum(self.conv4.weight.val());
        total = total + squared_sum(self.conv5.weight.val());
        total = total + squared_sum(self.fc1.weight.val());
        total = total + squared_sum(self.fc2.weight.val());
        total = total + squared_sum(self.fc3.weight.val());
        total = total + squared_sum(self.fc4.weight.val());

        for bias in [
            &self.conv1.bias,
            &self.conv2.bias,
            &self.conv3.bias,
            &self.conv4.bias,
            &self.conv5.bias,
        ] {
            if let Some(bias) = bias {
                total = total + squared_sum(bias.val());
            }
        }
        for bias in [&self.fc1.bias, &self.fc2.bias, &self.fc3.bias, &self.fc4.bias] {
            if let Some(bias) = bias {
                total = total + squared_sum(bias.val());
            }
        }

        total * 0.5
    }
}

fn squared_sum<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Tensor<B, 1> {
    tensor.powf_scalar(2.0).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InferenceBackend;

    #[test]
    fn test_network_output_shape() {
        let device = Default::default();
        let config = DriverNetworkConfig::new();
        let network = config.init::<InferenceBackend>(&device);

        let input = Tensor::zeros([2, 3, 66, 200], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [2, 1]);
    }

    #[test]
    fn test_network_single_input() {
        let device = Default::default();
        let config = DriverNetworkConfig::new();
        let network = config.init::<InferenceBackend>(&device);

        let input = Tensor::zeros([1, 3, 66, 200], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [1, 1]);
    }

    #[test]
    fn test_l2_penalty_is_positive() {
        let device = Default::default();
        let network = DriverNetworkConfig::new().init::<InferenceBackend>(&device);

        let penalty: f32 = network
            .l2_penalty()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 penalty extraction")[0];
        assert!(penalty > 0.0);
    }

    #[test]
    fn test_inference_is_deterministic() {
        // Dropout must not fire on the inference backend.
        let device = Default::default();
        let network = DriverNetworkConfig::new().init::<InferenceBackend>(&device);

        let input = Tensor::<InferenceBackend, 4>::ones([1, 3, 66, 200], &device);
        let a: Vec<f32> = network
            .forward(input.clone())
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction");
        let b: Vec<f32> = network
            .forward(input)
            .into_data()
            .to_vec()
            .expect("f32 tensor data extraction");
        assert_eq!(a, b);
    }
}
