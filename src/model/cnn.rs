//! Small CNN for CIFAR-10
//!
//! Two convolution + max-pool stages followed by three fully connected
//! layers:
//!
//! ```text
//! [N, 3, 32, 32] -conv1 5x5-> [N, 6, 28, 28] -pool-> [N, 6, 14, 14]
//!                -conv2 5x5-> [N, 16, 10, 10] -pool-> [N, 16, 5, 5]
//!                -flatten->   [N, 400] -fc1-> 120 -fc2-> 84 -fc3-> num_classes
//! ```

use burn::{
    config::Config,
    module::{Module, Param},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig,
    },
    tensor::{activation::relu, backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::{IMAGE_SIZE, NUM_CLASSES};

const CONV1_CHANNELS: usize = 6;
const CONV2_CHANNELS: usize = 16;
const KERNEL_SIZE: usize = 5;
const FC1_UNITS: usize = 120;
const FC2_UNITS: usize = 84;

/// Configuration for [`Net`]
#[derive(Config, Debug)]
pub struct NetConfig {
    /// Number of output classes
    #[config(default = "10")]
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,
}

impl NetConfig {
    /// Build a freshly initialized network on `device`
    pub fn init<B: Backend>(&self, device: &B::Device) -> Net<B> {
        Net::new(self, device)
    }

    /// Spatial size of the feature map entering `fc1`
    fn feature_side() -> usize {
        let after_conv1 = IMAGE_SIZE - KERNEL_SIZE + 1;
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1 - KERNEL_SIZE + 1;
        after_conv2 / 2
    }

    /// Flattened feature count entering `fc1` (400 for 32x32 input)
    pub fn flattened_features() -> usize {
        let side = Self::feature_side();
        CONV2_CHANNELS * side * side
    }

    /// Parameter shapes a network built from this config must have
    pub fn expected_shapes(&self) -> Vec<ParamShape> {
        let k = KERNEL_SIZE;
        vec![
            ParamShape::new("conv1.weight", vec![CONV1_CHANNELS, self.in_channels, k, k]),
            ParamShape::new("conv1.bias", vec![CONV1_CHANNELS]),
            ParamShape::new("conv2.weight", vec![CONV2_CHANNELS, CONV1_CHANNELS, k, k]),
            ParamShape::new("conv2.bias", vec![CONV2_CHANNELS]),
            // Burn stores linear weights as [d_input, d_output]
            ParamShape::new("fc1.weight", vec![Self::flattened_features(), FC1_UNITS]),
            ParamShape::new("fc1.bias", vec![FC1_UNITS]),
            ParamShape::new("fc2.weight", vec![FC1_UNITS, FC2_UNITS]),
            ParamShape::new("fc2.bias", vec![FC2_UNITS]),
            ParamShape::new("fc3.weight", vec![FC2_UNITS, self.num_classes]),
            ParamShape::new("fc3.bias", vec![self.num_classes]),
        ]
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self::new().with_num_classes(NUM_CLASSES)
    }
}

/// Name and dimensions of one learned tensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamShape {
    pub name: String,
    pub dims: Vec<usize>,
}

impl ParamShape {
    pub fn new(name: impl Into<String>, dims: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            dims,
        }
    }
}

impl std::fmt::Display for ParamShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.name, self.dims)
    }
}

// Works on both `Net` and its generated `NetRecord`, which share field names
macro_rules! named_shapes {
    ($src:expr) => {
        vec![
            ParamShape::new("conv1.weight", $src.conv1.weight.val().dims().to_vec()),
            ParamShape::new("conv1.bias", bias_dims(&$src.conv1.bias)),
            ParamShape::new("conv2.weight", $src.conv2.weight.val().dims().to_vec()),
            ParamShape::new("conv2.bias", bias_dims(&$src.conv2.bias)),
            ParamShape::new("fc1.weight", $src.fc1.weight.val().dims().to_vec()),
            ParamShape::new("fc1.bias", bias_dims(&$src.fc1.bias)),
            ParamShape::new("fc2.weight", $src.fc2.weight.val().dims().to_vec()),
            ParamShape::new("fc2.bias", bias_dims(&$src.fc2.bias)),
            ParamShape::new("fc3.weight", $src.fc3.weight.val().dims().to_vec()),
            ParamShape::new("fc3.bias", bias_dims(&$src.fc3.bias)),
        ]
    };
}

/// The classifier network
#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub pool: MaxPool2d,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,
}

impl<B: Backend> Net<B> {
    /// Create a new network from configuration
    pub fn new(config: &NetConfig, device: &B::Device) -> Self {
        let kernel = [KERNEL_SIZE, KERNEL_SIZE];

        Self {
            conv1: Conv2dConfig::new([config.in_channels, CONV1_CHANNELS], kernel).init(device),
            conv2: Conv2dConfig::new([CONV1_CHANNELS, CONV2_CHANNELS], kernel).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(NetConfig::flattened_features(), FC1_UNITS).init(device),
            fc2: LinearConfig::new(FC1_UNITS, FC2_UNITS).init(device),
            fc3: LinearConfig::new(FC2_UNITS, config.num_classes).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `images` - Tensor of shape `[batch_size, 3, 32, 32]`
    ///
    /// # Returns
    /// * Logits of shape `[batch_size, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(images)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));

        // Flatten everything except the batch dimension
        let x: Tensor<B, 2> = x.flatten(1, 3);

        let x = relu(self.fc1.forward(x));
        let x = relu(self.fc2.forward(x));
        self.fc3.forward(x)
    }

    /// Argmax class per sample
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 1, burn::tensor::Int> {
        let logits = self.forward(images);
        let [batch_size, _] = logits.dims();
        logits.argmax(1).reshape([batch_size])
    }

    /// Named shapes of every learned tensor, in declaration order
    pub fn param_shapes(&self) -> Vec<ParamShape> {
        named_shapes!(self)
    }

    /// Same listing as [`Net::param_shapes`], read from a record before it
    /// is loaded into a network
    pub fn record_shapes(record: &NetRecord<B>) -> Vec<ParamShape> {
        named_shapes!(record)
    }
}

fn bias_dims<B: Backend>(bias: &Option<Param<Tensor<B, 1>>>) -> Vec<usize> {
    bias.as_ref()
        .map(|b| b.val().dims().to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_net_output_shape() {
        let device = Default::default();
        let model = NetConfig::default().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 10]);
    }

    #[test]
    fn test_predict_returns_one_class_per_sample() {
        let device = Default::default();
        let model = NetConfig::default().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::ones([3, 3, 32, 32], &device);
        let predictions: Vec<i64> = model.predict(input).into_data().to_vec().unwrap();

        assert_eq!(predictions.len(), 3);
        assert!(predictions.iter().all(|&p| (0..10).contains(&p)));
    }

    #[test]
    fn test_flattened_features() {
        assert_eq!(NetConfig::flattened_features(), 16 * 5 * 5);
    }

    #[test]
    fn test_param_shapes_match_config() {
        let device = Default::default();
        let config = NetConfig::default();
        let model = config.init::<TestBackend>(&device);

        assert_eq!(model.param_shapes(), config.expected_shapes());
    }

    #[test]
    fn test_record_shapes_match_model() {
        let device = Default::default();
        let model = NetConfig::default().init::<TestBackend>(&device);
        let shapes = model.param_shapes();

        assert_eq!(Net::record_shapes(&model.into_record()), shapes);
    }

    #[test]
    fn test_num_classes_changes_head_only() {
        let small = NetConfig::new().with_num_classes(5).expected_shapes();
        let full = NetConfig::default().expected_shapes();

        let differing: Vec<_> = small
            .iter()
            .zip(full.iter())
            .filter(|(a, b)| a != b)
            .map(|(a, _)| a.name.as_str())
            .collect();
        assert_eq!(differing, vec!["fc3.weight", "fc3.bias"]);
    }
}
