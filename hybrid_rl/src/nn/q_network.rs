//! Multi-head Q-network over discrete heads and binned continuous dimensions.

use burn::module::Module;
use burn::prelude::*;

use crate::action_space::ActionSpace;
use crate::config::Activation;
use crate::nn::encoder::{FeedForwardEncoder, FeedForwardEncoderConfig};
use crate::nn::linear::{InitLinear, InitLinearConfig, VALUE_GAIN};

/// Per-head outputs of a [`QNetwork`].
///
/// With dueling, `value` is `V(s)` of shape `[batch, 1]` and the head tensors
/// are mean-centred advantages; otherwise `value` is `None` and the heads are
/// Q-values.
#[derive(Debug, Clone)]
pub struct QOutput<B: Backend> {
    pub value: Option<Tensor<B, 2>>,
    pub discrete: Vec<Tensor<B, 2>>,
    pub continuous: Vec<Tensor<B, 2>>,
}

impl<B: Backend> QOutput<B> {
    /// `A + V` for one head (identity without dueling).
    pub fn q_values(&self, head: Tensor<B, 2>) -> Tensor<B, 2> {
        match &self.value {
            Some(v) => head + v.clone(),
            None => head,
        }
    }
}

/// Configuration for [`QNetwork`].
#[derive(Debug, Clone)]
pub struct QNetworkConfig {
    pub obs_dim: usize,
    pub hidden_dims: Vec<usize>,
    pub activation: Activation,
    pub orthogonal: bool,
    pub dueling: bool,
    pub n_c_action_bins: usize,
    pub action_space: ActionSpace,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let encoder = FeedForwardEncoderConfig::new(self.obs_dim, self.hidden_dims.clone())
            .with_activation(self.activation)
            .with_orthogonal(self.orthogonal)
            .init(device);
        let d_hidden = encoder.output_dim();
        let head = |d_out: usize| {
            InitLinearConfig::new(d_hidden, d_out)
                .with_gain(VALUE_GAIN)
                .with_orthogonal(self.orthogonal)
                .init(device)
        };

        QNetwork {
            encoder,
            value_head: self.dueling.then(|| head(1)),
            discrete_heads: self
                .action_space
                .discrete_cardinalities()
                .iter()
                .map(|&n| head(n))
                .collect(),
            continuous_heads: (0..self.action_space.continuous_dim())
                .map(|_| head(self.n_c_action_bins))
                .collect(),
        }
    }
}

#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    encoder: FeedForwardEncoder<B>,
    value_head: Option<InitLinear<B>>,
    discrete_heads: Vec<InitLinear<B>>,
    continuous_heads: Vec<InitLinear<B>>,
}

impl<B: Backend> QNetwork<B> {
    pub fn forward(&self, obs: Tensor<B, 2>) -> QOutput<B> {
        let features = self.encoder.forward(obs);
        let dueling = self.value_head.is_some();

        let center = |adv: Tensor<B, 2>| {
            if dueling {
                let mean = adv.clone().mean_dim(1);
                adv - mean
            } else {
                adv
            }
        };

        QOutput {
            value: self.value_head.as_ref().map(|h| h.forward(features.clone())),
            discrete: self
                .discrete_heads
                .iter()
                .map(|h| center(h.forward(features.clone())))
                .collect(),
            continuous: self
                .continuous_heads
                .iter()
                .map(|h| center(h.forward(features.clone())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn config(dueling: bool) -> QNetworkConfig {
        QNetworkConfig {
            obs_dim: 3,
            hidden_dims: vec![16],
            activation: Activation::Relu,
            orthogonal: false,
            dueling,
            n_c_action_bins: 7,
            action_space: ActionSpace::new(2, &[0.0, 0.0], &[1.0, 2.0], vec![4, 5]).unwrap(),
        }
    }

    #[test]
    fn test_head_shapes() {
        let device = Default::default();
        let q: QNetwork<TestBackend> = config(false).init(&device);
        let out = q.forward(Tensor::ones([3, 3], &device));
        assert!(out.value.is_none());
        assert_eq!(out.discrete[0].dims(), [3, 4]);
        assert_eq!(out.discrete[1].dims(), [3, 5]);
        assert_eq!(out.continuous.len(), 2);
        assert!(out.continuous.iter().all(|head| head.dims() == [3, 7]));
    }

    #[test]
    fn test_dueling_advantages_are_mean_centred() {
        let device = Default::default();
        let q: QNetwork<TestBackend> = config(true).init(&device);
        let out = q.forward(Tensor::random(
            [4, 3],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        ));
        assert_eq!(out.value.as_ref().unwrap().dims(), [4, 1]);
        for head in out.discrete.iter().chain(out.continuous.iter()) {
            let max_mean: f32 = head.clone().mean_dim(1).abs().max().into_scalar();
            assert!(max_mean < 1e-5);
        }
    }
}
