//! Learning-rate and exploration schedules.
//!
//! ## Available Schedules
//!
//! - [`AnnealedLR`]: linear anneal over environment steps, floored at 1e-4 of the base rate
//!   (`anneal_steps = 0` keeps the base rate)
//! - [`EpsilonDecay`]: `eps0 (1 - step / (step + half_life))`
//!
//! ## Example
//!
//! ```rust,ignore
//! use hybrid_rl::scheduling::{AnnealedLR, LRScheduler};
//!
//! let scheduler = AnnealedLR::new(2.5e-3, 200_000);
//! let lr = scheduler.get_lr(env_steps);
//! model = optimizer.step(lr, model, grads);
//! ```

pub mod lr_scheduler;

#[cfg(test)]
mod tests;

pub use lr_scheduler::{AnnealedLR, EpsilonDecay, LRScheduler};
