//! Feed-forward observation encoder shared by actors, critics and Q-networks.

use burn::module::{Ignored, Module};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid, tanh};

use crate::config::Activation;
use crate::nn::linear::{InitLinear, InitLinearConfig, HIDDEN_GAIN};

/// Configuration for [`FeedForwardEncoder`].
#[derive(Debug, Clone)]
pub struct FeedForwardEncoderConfig {
    pub obs_dim: usize,
    pub hidden_dims: Vec<usize>,
    pub activation: Activation,
    pub orthogonal: bool,
}

impl FeedForwardEncoderConfig {
    pub fn new(obs_dim: usize, hidden_dims: Vec<usize>) -> Self {
        Self {
            obs_dim,
            hidden_dims,
            activation: Activation::Relu,
            orthogonal: false,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_orthogonal(mut self, orthogonal: bool) -> Self {
        self.orthogonal = orthogonal;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForwardEncoder<B> {
        let mut d_in = self.obs_dim;
        let layers = self
            .hidden_dims
            .iter()
            .map(|&d_out| {
                let layer = InitLinearConfig::new(d_in, d_out)
                    .with_gain(HIDDEN_GAIN)
                    .with_orthogonal(self.orthogonal)
                    .init(device);
                d_in = d_out;
                layer
            })
            .collect();

        FeedForwardEncoder {
            layers,
            activation: Ignored(self.activation),
        }
    }
}

/// Stack of linear layers, each followed by the configured activation.
#[derive(Module, Debug)]
pub struct FeedForwardEncoder<B: Backend> {
    layers: Vec<InitLinear<B>>,
    activation: Ignored<Activation>,
}

impl<B: Backend> FeedForwardEncoder<B> {
    /// `[batch, obs_dim] -> [batch, hidden_dims.last()]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.layers
            .iter()
            .fold(x, |h, layer| activate(layer.forward(h), *self.activation))
    }

    /// Width of the encoder output.
    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.d_output()).unwrap_or(0)
    }
}

/// Apply an [`Activation`] element-wise.
pub fn activate<B: Backend, const D: usize>(x: Tensor<B, D>, activation: Activation) -> Tensor<B, D> {
    match activation {
        Activation::Relu => relu(x),
        Activation::Tanh => tanh(x),
        Activation::Sigmoid => sigmoid(x),
        Activation::None => x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_encoder_output_shape() {
        let device = Default::default();
        let encoder: FeedForwardEncoder<TestBackend> =
            FeedForwardEncoderConfig::new(3, vec![32, 16]).init(&device);
        let x = Tensor::<TestBackend, 2>::ones([5, 3], &device);
        assert_eq!(encoder.forward(x).dims(), [5, 16]);
        assert_eq!(encoder.output_dim(), 16);
    }

    #[test]
    fn test_encoder_is_deterministic() {
        let device = Default::default();
        let encoder: FeedForwardEncoder<TestBackend> = FeedForwardEncoderConfig::new(3, vec![8])
            .with_activation(Activation::Tanh)
            .with_orthogonal(true)
            .init(&device);
        let x = Tensor::<TestBackend, 2>::from_floats([[0.1, -0.2, 0.3]], &device);
        let a: Vec<f32> = encoder.forward(x.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = encoder.forward(x).into_data().iter::<f32>().collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_relu_output_non_negative() {
        let device = Default::default();
        let encoder: FeedForwardEncoder<TestBackend> =
            FeedForwardEncoderConfig::new(4, vec![16]).init(&device);
        let x = Tensor::<TestBackend, 2>::random(
            [10, 4],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let min: f32 = encoder.forward(x).min().into_scalar();
        assert!(min >= 0.0);
    }

    #[test]
    fn test_activation_survives_record_round_trip() {
        let device = Default::default();
        let config = FeedForwardEncoderConfig::new(3, vec![8]).with_activation(Activation::Sigmoid);
        let source: FeedForwardEncoder<TestBackend> = config.init(&device);
        let target: FeedForwardEncoder<TestBackend> = config.init(&device).load_record(source.clone().into_record());

        let x = Tensor::<TestBackend, 2>::from_floats([[0.4, -1.0, 2.0]], &device);
        let a: Vec<f32> = source.forward(x.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = target.forward(x).into_data().iter::<f32>().collect();
        assert_eq!(a, b);
        assert!(b.iter().all(|v| *v > 0.0 && *v < 1.0));
    }
}
