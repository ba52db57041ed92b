//! Supervised losses for learning from expert actions.

use burn::prelude::*;

use crate::algorithms::distribution::{categorical_log_prob, ContinuousPolicy};

/// Target standard deviation of the naive continuous imitation loss.
const NAIVE_TARGET_STD: f32 = 0.1;

/// Cross-entropy of one discrete head against expert indices `[batch, 1]`.
pub fn discrete_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    expert: Tensor<B, 2, Int>,
) -> Tensor<B, 1> {
    categorical_log_prob(logits, expert).mean().neg()
}

/// Negative log-likelihood of expert actions under the sampling distribution.
///
/// `log_std` must already be bounded.
pub fn continuous_mle_loss<B: Backend>(
    policy: &ContinuousPolicy,
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 2>,
    expert: Tensor<B, 2>,
) -> Tensor<B, 1> {
    policy.log_prob(expert, mean, log_std).mean().neg()
}

/// `MSE(processed mean, expert) + MSE(std, 0.1)`.
pub fn naive_imitation_loss<B: Backend>(
    policy: &ContinuousPolicy,
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 2>,
    expert: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let mean_loss = (policy.mode(mean) - expert).powf_scalar(2.0).mean();
    let std_loss = (log_std.exp() - NAIVE_TARGET_STD).powf_scalar(2.0).mean();
    mean_loss + std_loss
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::distribution::index_column;
    use crate::config::ActionClampType;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_cross_entropy_uniform_logits() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::zeros([3, 5], &device);
        let loss: f32 = discrete_cross_entropy(logits, index_column(&[0, 2, 4], &device)).into_scalar();
        assert!((loss - 5.0f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_cross_entropy_prefers_matching_logits() {
        let device = Default::default();
        let good = Tensor::<TestBackend, 2>::from_floats([[5.0, 0.0]], &device);
        let bad = Tensor::<TestBackend, 2>::from_floats([[0.0, 5.0]], &device);
        let target = index_column(&[0], &device);
        let good_loss: f32 = discrete_cross_entropy(good, target.clone()).into_scalar();
        let bad_loss: f32 = discrete_cross_entropy(bad, target).into_scalar();
        assert!(good_loss < bad_loss);
    }

    #[test]
    fn test_naive_loss_zero_at_target() {
        let device = Default::default();
        let policy = ContinuousPolicy::new(vec![-1.0], vec![1.0], ActionClampType::Clamp, (-5.0, 2.0));
        let mean = Tensor::<TestBackend, 2>::from_floats([[0.3]], &device);
        let log_std = Tensor::<TestBackend, 2>::from_floats([[NAIVE_TARGET_STD.ln()]], &device);
        let expert = Tensor::<TestBackend, 2>::from_floats([[0.3]], &device);
        let loss: f32 = naive_imitation_loss(&policy, mean, log_std, expert).into_scalar();
        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn test_mle_loss_lower_near_mean() {
        let device = Default::default();
        let policy = ContinuousPolicy::new(vec![0.0], vec![2.0], ActionClampType::Tanh, (-5.0, 2.0));
        let mean = Tensor::<TestBackend, 2>::zeros([1, 1], &device);
        let log_std = Tensor::<TestBackend, 2>::from_floats([[-1.0]], &device);
        let near = Tensor::<TestBackend, 2>::from_floats([[1.0]], &device);
        let far = Tensor::<TestBackend, 2>::from_floats([[1.9]], &device);
        let near_loss: f32 = continuous_mle_loss(&policy, mean.clone(), log_std.clone(), near).into_scalar();
        let far_loss: f32 = continuous_mle_loss(&policy, mean, log_std, far).into_scalar();
        assert!(near_loss < far_loss);
    }
}
