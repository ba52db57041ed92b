//! Surrogate and value losses of the policy-gradient learner.
//!
//! # Numerical Stability
//!
//! Importance ratios are computed as `exp(log_ratio)` with the log ratio
//! clamped to [-20, 20], which bounds ratios to roughly [2e-9, 4.85e8].

use burn::prelude::*;

/// Maximum log ratio before exp().
const MAX_LOG_RATIO: f32 = 20.0;

/// PPO clipped surrogate loss.
///
/// L^CLIP = -E[min(r A, clip(r, 1-eps, 1+eps) A)],
/// r = exp(log pi_new - log pi_old)
///
/// # Arguments
///
/// * `log_probs` - current policy log probs: [batch]
/// * `old_log_probs` - collection-time log probs (no gradient): [batch]
/// * `advantages` - advantages (no gradient): [batch]
/// * `clip_ratio` - epsilon
///
/// # Returns
///
/// Single-element loss tensor.
pub fn ppo_clip_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_ratio: f32,
) -> Tensor<B, 1> {
    let ratio = (log_probs - old_log_probs)
        .clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO)
        .exp();
    let clipped_ratio = ratio.clone().clamp(1.0 - clip_ratio, 1.0 + clip_ratio);

    let surr1 = ratio * advantages.clone();
    let surr2 = clipped_ratio * advantages;

    surr1.min_pair(surr2).mean().neg()
}

/// Vanilla policy gradient: `-E[log pi(a|s) A]`.
pub fn vanilla_pg_loss<B: Backend>(log_probs: Tensor<B, 1>, advantages: Tensor<B, 1>) -> Tensor<B, 1> {
    (log_probs * advantages).mean().neg()
}

/// Critic regression loss `0.5 * mean((V - G)^2)`.
///
/// With `clip_value = Some(c)` the PPO2 clipped form is used:
/// `0.5 * mean(max((V - G)^2, (V_old + clamp(V - V_old, -c, c) - G)^2))`.
pub fn critic_loss<B: Backend>(
    values: Tensor<B, 1>,
    old_values: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    clip_value: Option<f32>,
) -> Tensor<B, 1> {
    let unclipped = (values.clone() - returns.clone()).powf_scalar(2.0);
    let per_sample = match clip_value {
        Some(clip) => {
            let values_clipped = old_values.clone() + (values - old_values).clamp(-clip, clip);
            let clipped = (values_clipped - returns).powf_scalar(2.0);
            unclipped.max_pair(clipped)
        }
        None => unclipped,
    };
    per_sample.mean().mul_scalar(0.5)
}
