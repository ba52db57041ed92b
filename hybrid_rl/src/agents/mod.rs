//! Learning agents and their shared contract.
//!
//! - [`PgAgent`]: PPO / vanilla policy gradient over hybrid actions
//! - [`DqnAgent`]: multi-head Q-learning (greedy, soft or Munchausen targets)
//!
//! Callers that do not care which learner they drive are generic over
//! [`Agent`]:
//!
//! ```rust,ignore
//! fn rollout<B: AutodiffBackend, A: Agent<B>>(agent: &mut A, obs: &[f32]) -> Result<()> {
//!     let action = agent.select_action(obs, None, true)?;
//!     // ... step the environment, fill a TrajectoryBatch ...
//!     let (actor_loss, critic_loss) = agent.update_from_batch(&batch, 0)?;
//!     Ok(())
//! }
//! ```

pub mod dqn;
pub mod pg;


use std::path::Path;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::action_space::ActionSpace;
use crate::algorithms::distribution::mask_logits;
use crate::batch::TrajectoryBatch;
use crate::error::{HybridRlError, Result};

pub use dqn::DqnAgent;
pub use pg::{PgAgent, PgModel};

/// One action chosen for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSelection {
    /// One index per discrete head.
    pub discrete: Vec<usize>,
    /// One value per continuous dimension, inside the declared bounds.
    pub continuous: Vec<f32>,
    /// `log pi(a_h | s)` per discrete head (zeros for value-based agents).
    pub discrete_log_probs: Vec<f32>,
    /// `log pi(a_c | s)` summed over dimensions (zero for value-based agents).
    pub continuous_log_prob: f32,
}

/// Interface shared by every learner.
///
/// Observations are flat row-major `f32` slices of `obs_dim` values per row;
/// masks are flat per-head legality rows concatenated in head order.
pub trait Agent<B: AutodiffBackend>: Sized {
    /// Exploratory action for one observation. `step = true` advances the
    /// agent's schedules by one environment step.
    fn select_action(&mut self, obs: &[f32], mask: Option<&[f32]>, step: bool) -> Result<ActionSelection>;

    /// Greedy / mode action for one observation.
    fn evaluate_action_deterministic(&self, obs: &[f32], mask: Option<&[f32]>) -> Result<(Vec<usize>, Vec<f32>)>;

    /// One supervised step towards expert actions. Returns
    /// `(discrete_loss, continuous_loss)`.
    fn imitation_update(
        &mut self,
        obs: &[f32],
        expert_discrete: Option<&[f32]>,
        expert_continuous: Option<&[f32]>,
    ) -> Result<(f32, f32)>;

    /// Value per observation row.
    ///
    /// `actions` holds `(discrete, continuous)` rows in batch layout: one index
    /// per head stored as `f32`, then one value per continuous dimension. When
    /// given, learners with an action-value critic return `Q(s, a)`; otherwise
    /// the state value.
    fn value_estimate(&self, obs: &[f32], actions: Option<(&[f32], &[f32])>) -> Result<Vec<f32>>;

    /// Value of one observation under the agent's acting policy.
    fn expected_value(&self, obs: &[f32], mask: Option<&[f32]>) -> Result<f32>;

    /// One learning call on one agent's trajectory. Returns two losses whose
    /// meaning depends on the learner (actor / critic, or discrete / continuous).
    fn update_from_batch(&mut self, batch: &TrajectoryBatch, agent_index: usize) -> Result<(f32, f32)>;

    fn save(&self, path: impl AsRef<Path>) -> Result<()>;

    fn load(path: impl AsRef<Path>, device: &B::Device) -> Result<Self>;
}

// ============================================================================
// Shared helpers
// ============================================================================

/// `[rows, width]` tensor from row-major data.
pub(crate) fn rows_tensor<B: Backend>(data: &[f32], width: usize, device: &B::Device) -> Result<Tensor<B, 2>> {
    if width == 0 || data.is_empty() || data.len() % width != 0 {
        return Err(HybridRlError::shape(format!(
            "expected a non-empty multiple of {} values, got {}",
            width,
            data.len()
        )));
    }
    Ok(Tensor::<B, 1>::from_floats(data, device).reshape([data.len() / width, width]))
}

/// `[1, width]` tensor from exactly one row.
pub(crate) fn single_row<B: Backend>(data: &[f32], width: usize, device: &B::Device) -> Result<Tensor<B, 2>> {
    if data.len() != width {
        return Err(HybridRlError::shape(format!(
            "expected one row of {} values, got {}",
            width,
            data.len()
        )));
    }
    rows_tensor(data, width, device)
}

/// Apply a concatenated `[batch, total_logits]` mask to per-head outputs.
pub(crate) fn mask_heads<B: Backend>(
    heads: Vec<Tensor<B, 2>>,
    mask: Option<&Tensor<B, 2>>,
    space: &ActionSpace,
) -> Vec<Tensor<B, 2>> {
    let Some(mask) = mask else {
        return heads;
    };
    let [batch, _] = mask.dims();
    heads
        .into_iter()
        .zip(space.head_offsets())
        .zip(space.discrete_cardinalities())
        .map(|((head, offset), &n)| mask_logits(head, mask.clone().slice([0..batch, offset..offset + n])))
        .collect()
}

/// `[len]` tensor.
pub(crate) fn vector<B: Backend>(data: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::<B, 1>::from_floats(data, device)
}

pub(crate) fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

pub(crate) fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    to_vec(tensor).first().copied().unwrap_or(0.0)
}

/// Fail with `NonFiniteOutput` (and log the inputs) if any value is NaN or infinite.
pub(crate) fn ensure_finite(values: &[f32], what: &str, obs: &[f32]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        return Ok(());
    }
    log::error!("non-finite {} for observation {:?}: {:?}", what, obs, values);
    Err(HybridRlError::NonFiniteOutput(format!("{} for observation {:?}", what, obs)))
}

/// Expert discrete rows to per-head index columns, validated against `cardinalities`.
pub(crate) fn head_indices(actions: &[f32], cardinalities: &[usize]) -> Result<Vec<Vec<usize>>> {
    let heads = cardinalities.len();
    if heads == 0 || actions.len() % heads != 0 {
        return Err(HybridRlError::shape(format!(
            "discrete actions have {} values, not a multiple of {} heads",
            actions.len(),
            heads
        )));
    }
    let mut columns = vec![Vec::with_capacity(actions.len() / heads); heads];
    for row in actions.chunks(heads) {
        for (h, (&a, &n)) in row.iter().zip(cardinalities).enumerate() {
            if a < 0.0 || a.fract() != 0.0 || a as usize >= n {
                return Err(HybridRlError::InvalidAction(format!(
                    "discrete action {} is not an index of head {} (cardinality {})",
                    a, h, n
                )));
            }
            columns[h].push(a as usize);
        }
    }
    Ok(columns)
}
