//! Hybrid stochastic actor and state-value critic.

use burn::module::{Module, Param};
use burn::prelude::*;

use crate::action_space::ActionSpace;
use crate::config::{Activation, StdType};
use crate::nn::encoder::{FeedForwardEncoder, FeedForwardEncoderConfig};
use crate::nn::linear::{InitLinear, InitLinearConfig, POLICY_GAIN, VALUE_GAIN};

/// Raw actor outputs for a batch of observations.
///
/// `continuous_log_std` holds unclamped log-std logits already broadcast to
/// `[batch, continuous_dim]`; it is `None` for stateless log-std, which lives
/// outside the actor.
#[derive(Debug, Clone)]
pub struct ActorOutput<B: Backend> {
    pub continuous_mean: Option<Tensor<B, 2>>,
    pub continuous_log_std: Option<Tensor<B, 2>>,
    pub discrete_logits: Vec<Tensor<B, 2>>,
}

/// Shared encoder followed by one mean head, an optional log-std head and one
/// logit head per discrete action head.
#[derive(Module, Debug)]
pub struct HybridActor<B: Backend> {
    encoder: FeedForwardEncoder<B>,
    mean_head: Option<InitLinear<B>>,
    log_std_head: Option<InitLinear<B>>,
    discrete_heads: Vec<InitLinear<B>>,
    continuous_dim: usize,
}

/// Configuration for [`HybridActor`].
#[derive(Debug, Clone)]
pub struct HybridActorConfig {
    pub obs_dim: usize,
    pub hidden_dims: Vec<usize>,
    pub activation: Activation,
    pub orthogonal: bool,
    pub std_type: StdType,
    pub action_space: ActionSpace,
}

impl HybridActorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HybridActor<B> {
        let encoder = FeedForwardEncoderConfig::new(self.obs_dim, self.hidden_dims.clone())
            .with_activation(self.activation)
            .with_orthogonal(self.orthogonal)
            .init(device);
        let d_hidden = encoder.output_dim();
        let continuous_dim = self.action_space.continuous_dim();

        let head = |d_out: usize| {
            InitLinearConfig::new(d_hidden, d_out)
                .with_gain(POLICY_GAIN)
                .with_orthogonal(self.orthogonal)
                .init(device)
        };

        let mean_head = (continuous_dim > 0).then(|| head(continuous_dim));
        let log_std_head = match self.std_type {
            _ if continuous_dim == 0 => None,
            StdType::Stateless => None,
            StdType::Diagonal => Some(head(1)),
            StdType::Full => Some(head(continuous_dim)),
        };
        let discrete_heads = self
            .action_space
            .discrete_cardinalities()
            .iter()
            .map(|&n| head(n))
            .collect();

        HybridActor {
            encoder,
            mean_head,
            log_std_head,
            discrete_heads,
            continuous_dim,
        }
    }
}

impl<B: Backend> HybridActor<B> {
    pub fn forward(&self, obs: Tensor<B, 2>) -> ActorOutput<B> {
        let features = self.encoder.forward(obs);
        let [batch, _] = features.dims();

        let continuous_mean = self.mean_head.as_ref().map(|h| h.forward(features.clone()));
        let continuous_log_std = self.log_std_head.as_ref().map(|h| {
            let raw = h.forward(features.clone());
            if raw.dims()[1] == self.continuous_dim {
                raw
            } else {
                // Diagonal: one scalar shared by every dimension.
                raw.repeat_dim(1, self.continuous_dim)
            }
        });
        let discrete_logits = self
            .discrete_heads
            .iter()
            .map(|h| h.forward(features.clone()))
            .collect::<Vec<_>>();

        debug_assert!(discrete_logits.iter().all(|l| l.dims()[0] == batch));
        ActorOutput {
            continuous_mean,
            continuous_log_std,
            discrete_logits,
        }
    }
}

/// State-independent log standard deviation, stored as its own record.
#[derive(Module, Debug)]
pub struct StatelessLogStd<B: Backend> {
    pub log_std: Param<Tensor<B, 1>>,
}

impl<B: Backend> StatelessLogStd<B> {
    /// Starts at zero log-std logits.
    pub fn new(continuous_dim: usize, device: &B::Device) -> Self {
        Self {
            log_std: Param::from_tensor(Tensor::zeros([continuous_dim], device)),
        }
    }

    /// Broadcast to `[batch, continuous_dim]`.
    pub fn expand(&self, batch: usize) -> Tensor<B, 2> {
        self.log_std.val().unsqueeze_dim(0).repeat_dim(0, batch)
    }
}

/// `V(s)` regression network.
#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    encoder: FeedForwardEncoder<B>,
    head: InitLinear<B>,
}

impl<B: Backend> ValueNetwork<B> {
    pub fn new(
        obs_dim: usize,
        hidden_dims: Vec<usize>,
        activation: Activation,
        orthogonal: bool,
        device: &B::Device,
    ) -> Self {
        let encoder = FeedForwardEncoderConfig::new(obs_dim, hidden_dims)
            .with_activation(activation)
            .with_orthogonal(orthogonal)
            .init(device);
        let head = InitLinearConfig::new(encoder.output_dim(), 1)
            .with_gain(VALUE_GAIN)
            .with_orthogonal(orthogonal)
            .init(device);
        Self { encoder, head }
    }

    /// `[batch, obs_dim] -> [batch]`
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch, _] = obs.dims();
        self.head.forward(self.encoder.forward(obs)).reshape([batch])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn config(std_type: StdType) -> HybridActorConfig {
        HybridActorConfig {
            obs_dim: 3,
            hidden_dims: vec![16, 16],
            activation: Activation::Relu,
            orthogonal: true,
            std_type,
            action_space: ActionSpace::new(2, &[0.0, 0.0], &[1.0, 2.0], vec![4, 5]).unwrap(),
        }
    }

    #[test]
    fn test_actor_head_shapes() {
        let device = Default::default();
        let actor: HybridActor<TestBackend> = config(StdType::Full).init(&device);
        let out = actor.forward(Tensor::ones([6, 3], &device));

        assert_eq!(out.continuous_mean.unwrap().dims(), [6, 2]);
        assert_eq!(out.continuous_log_std.unwrap().dims(), [6, 2]);
        assert_eq!(out.discrete_logits.len(), 2);
        assert_eq!(out.discrete_logits[0].dims(), [6, 4]);
        assert_eq!(out.discrete_logits[1].dims(), [6, 5]);
    }

    #[test]
    fn test_diagonal_log_std_is_shared_across_dimensions() {
        let device = Default::default();
        let actor: HybridActor<TestBackend> = config(StdType::Diagonal).init(&device);
        let out = actor.forward(Tensor::ones([3, 3], &device));
        let log_std: Vec<f32> = out.continuous_log_std.unwrap().into_data().iter::<f32>().collect();
        for row in log_std.chunks(2) {
            assert_eq!(row[0], row[1]);
        }
    }

    #[test]
    fn test_stateless_actor_has_no_log_std_head() {
        let device = Default::default();
        let actor: HybridActor<TestBackend> = config(StdType::Stateless).init(&device);
        let out = actor.forward(Tensor::ones([2, 3], &device));
        assert!(out.continuous_log_std.is_none());

        let log_std = StatelessLogStd::<TestBackend>::new(2, &device);
        assert_eq!(log_std.expand(4).dims(), [4, 2]);
    }

    #[test]
    fn test_value_network_shape() {
        let device = Default::default();
        let critic = ValueNetwork::<TestBackend>::new(3, vec![8, 8], Activation::Tanh, false, &device);
        assert_eq!(critic.forward(Tensor::zeros([5, 3], &device)).dims(), [5]);
    }
}
