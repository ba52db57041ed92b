//! Categorical and (squashed) Gaussian heads of the hybrid policy.
//!
//! Discrete heads are categoricals over optionally masked logits. The
//! continuous head is a diagonal Gaussian whose samples are either squashed
//! through `tanh` and rescaled into the action bounds, or hard-clipped into
//! them.
//!
//! ## Tanh squashing
//!
//! ```text
//! u ~ N(mean, std),  y = tanh(u),  a = min + (y + 1)(max - min) / 2
//! log pi(a) = sum_i [ log N(atanh(y_i); mean_i, std_i) - log(1 - y_i^2 + 1e-6) ]
//! ```
//!
//! Log-probabilities are always evaluated from the stored action `a`, so the
//! value recorded at collection time and the value recomputed during learning
//! come from the same formula.

use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax, tanh};
use burn::tensor::Distribution;

use crate::config::ActionClampType;

/// Logit assigned to illegal actions.
pub const MASK_FILL: f32 = -1e8;

const EPSILON: f32 = 1e-6;

// ============================================================================
// Discrete heads
// ============================================================================

/// Replace logits whose mask entry is 0 by [`MASK_FILL`].
pub fn mask_logits<B: Backend>(logits: Tensor<B, 2>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
    logits.mask_fill(mask.equal_elem(0.0), MASK_FILL)
}

/// `log softmax(logits)[a]` per row.
///
/// * `logits` - [batch, n_actions]
/// * `actions` - [batch, 1]
pub fn categorical_log_prob<B: Backend>(
    logits: Tensor<B, 2>,
    actions: Tensor<B, 2, Int>,
) -> Tensor<B, 1> {
    log_softmax(logits, 1).gather(1, actions).flatten(0, 1)
}

/// Categorical entropy per row: `-sum p log p`.
pub fn categorical_entropy<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_p = log_softmax(logits.clone(), 1);
    let p = softmax(logits, 1);
    (p * log_p).sum_dim(1).flatten(0, 1).neg()
}

/// Draw one index per row of a row-major probability matrix.
pub fn sample_categorical(probs: &[f32], n_actions: usize) -> Vec<usize> {
    probs
        .chunks(n_actions)
        .map(|row| {
            let rand_val = fastrand::f32();
            let mut cumsum = 0.0;
            for (a, p) in row.iter().enumerate() {
                cumsum += p;
                // The last action also absorbs rounding error in the row sum.
                if rand_val < cumsum || a == n_actions - 1 {
                    return a;
                }
            }
            n_actions - 1
        })
        .collect()
}

/// Index of the largest value per row (first one on ties).
pub fn argmax_rows(values: &[f32], n_actions: usize) -> Vec<usize> {
    values
        .chunks(n_actions)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
                    if v > best_v {
                        (i, v)
                    } else {
                        (best, best_v)
                    }
                })
                .0
        })
        .collect()
}

/// Integer action column `[batch, 1]` from per-row indices.
pub fn index_column<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 2, Int> {
    let ints: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device).reshape([indices.len(), 1])
}

// ============================================================================
// Continuous head
// ============================================================================

/// `[1, d]` row tensor.
pub fn row<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(values, device).reshape([1, values.len()])
}

/// Diagonal Gaussian log-density summed over dimensions.
pub fn gaussian_log_prob<B: Backend>(
    x: Tensor<B, 2>,
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_2pi = (2.0 * std::f32::consts::PI).ln();
    let normalized = (x - mean) / log_std.clone().exp();
    let per_dim = normalized.powf_scalar(2.0).mul_scalar(-0.5) - log_std - 0.5 * log_2pi;
    per_dim.sum_dim(1).flatten(0, 1)
}

/// Closed-form diagonal Gaussian entropy per row.
pub fn gaussian_entropy<B: Backend>(log_std: Tensor<B, 2>) -> Tensor<B, 1> {
    let action_dim = log_std.dims()[1] as f32;
    let log_2pi = (2.0 * std::f32::consts::PI).ln();
    log_std
        .sum_dim(1)
        .flatten(0, 1)
        .add_scalar(0.5 * action_dim * (1.0 + log_2pi))
}

/// `atanh(x)` for `x` inside `(-1, 1)`.
fn atanh<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let one_plus_x = x.clone() + 1.0;
    let one_minus_x = -x + 1.0;
    (one_plus_x / one_minus_x).log() * 0.5
}

/// Continuous action head: bounds, clamp policy and log-std range.
#[derive(Debug, Clone)]
pub struct ContinuousPolicy {
    min_actions: Vec<f32>,
    max_actions: Vec<f32>,
    clamp_type: ActionClampType,
    log_std_range: (f32, f32),
}

impl ContinuousPolicy {
    pub fn new(
        min_actions: Vec<f32>,
        max_actions: Vec<f32>,
        clamp_type: ActionClampType,
        log_std_range: (f32, f32),
    ) -> Self {
        Self {
            min_actions,
            max_actions,
            clamp_type,
            log_std_range,
        }
    }

    pub fn clamp_type(&self) -> ActionClampType {
        self.clamp_type
    }

    /// Map raw log-std logits into `log_std_range`.
    pub fn bound_log_std<B: Backend>(&self, raw: Tensor<B, 2>) -> Tensor<B, 2> {
        let (lo, hi) = self.log_std_range;
        match self.clamp_type {
            ActionClampType::Tanh => (tanh(raw) + 1.0).mul_scalar(0.5 * (hi - lo)).add_scalar(lo),
            ActionClampType::Clamp => raw.clamp(lo, hi),
        }
    }

    fn bounds<B: Backend>(&self, batch: usize, device: &B::Device) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (
            row::<B>(&self.min_actions, device).repeat_dim(0, batch),
            row::<B>(&self.max_actions, device).repeat_dim(0, batch),
        )
    }

    /// `[-1, 1] -> [min, max]`
    pub fn rescale<B: Backend>(&self, y: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = y.dims();
        let (min, max) = self.bounds::<B>(batch, &y.device());
        min.clone() + (y + 1.0) * (max - min) * 0.5
    }

    /// `[min, max] -> [-1, 1]`
    pub fn minmax_norm<B: Backend>(&self, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = actions.dims();
        let (min, max) = self.bounds::<B>(batch, &actions.device());
        (actions - min.clone()) * 2.0 / (max - min) - 1.0
    }

    fn clip<B: Backend>(&self, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = actions.dims();
        let (min, max) = self.bounds::<B>(batch, &actions.device());
        actions.max_pair(min).min_pair(max)
    }

    /// Deterministic action: the distribution mode pushed through the clamp policy.
    pub fn mode<B: Backend>(&self, mean: Tensor<B, 2>) -> Tensor<B, 2> {
        match self.clamp_type {
            ActionClampType::Tanh => self.rescale(tanh(mean)),
            ActionClampType::Clamp => self.clip(mean),
        }
    }

    /// Sample bounded actions; `log_std` must already be bounded.
    pub fn sample<B: Backend>(&self, mean: Tensor<B, 2>, log_std: Tensor<B, 2>) -> Tensor<B, 2> {
        let noise = Tensor::random(mean.dims(), Distribution::Normal(0.0, 1.0), &mean.device());
        let u = mean + log_std.exp() * noise;
        self.mode(u)
    }

    /// Log-probability of stored actions, summed over dimensions: `[batch]`.
    pub fn log_prob<B: Backend>(
        &self,
        actions: Tensor<B, 2>,
        mean: Tensor<B, 2>,
        log_std: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        match self.clamp_type {
            ActionClampType::Tanh => {
                let y = self.minmax_norm(actions).clamp(-1.0 + EPSILON, 1.0 - EPSILON);
                let jacobian = (-y.clone() * y.clone() + 1.0 + EPSILON)
                    .log()
                    .sum_dim(1)
                    .flatten(0, 1);
                gaussian_log_prob(atanh(y), mean, log_std) - jacobian
            }
            ActionClampType::Clamp => gaussian_log_prob(actions, mean, log_std),
        }
    }

    /// Scalar entropy estimate of the batch.
    ///
    /// Squashed Gaussians have no closed form, so `-mean(log_prob)` of the
    /// supplied log-probabilities stands in for it.
    pub fn entropy<B: Backend>(&self, log_std: Tensor<B, 2>, log_prob: Tensor<B, 1>) -> Tensor<B, 1> {
        match self.clamp_type {
            ActionClampType::Tanh => log_prob.mean().neg(),
            ActionClampType::Clamp => gaussian_entropy(log_std).mean(),
        }
    }
}
