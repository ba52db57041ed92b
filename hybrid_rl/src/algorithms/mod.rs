//! Learning math shared by the agents.
//!
//! - `distribution`: categorical and (squashed) Gaussian action heads
//! - `advantage`: Monte-Carlo returns, GAE and the five advantage modes
//! - `policy_loss`: PPO clipped surrogate, vanilla PG and critic losses
//! - `imitation`: cross-entropy, Gaussian MLE and naive MSE imitation losses
//! - `dqn_targets`: discretization and greedy / soft / Munchausen TD targets
//! - `grad_clip`: global gradient-norm clipping

pub mod advantage;
pub mod distribution;
pub mod dqn_targets;
pub mod grad_clip;
pub mod imitation;
pub mod policy_loss;

pub use advantage::{compute_gae, monte_carlo_returns, normalize_advantages, AdvantageEstimator};
pub use distribution::{ContinuousPolicy, MASK_FILL};
pub use dqn_targets::{expected_head_value, td_target, Discretizer};
pub use grad_clip::{clip_grad_norm, global_grad_norm};
pub use policy_loss::{critic_loss, ppo_clip_loss, vanilla_pg_loss};
