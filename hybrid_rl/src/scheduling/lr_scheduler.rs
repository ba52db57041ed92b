//! Learning-rate and exploration schedules.
//!
//! - `AnnealedLR`: linear anneal of the learning rate with a relative floor
//! - `EpsilonDecay`: hyperbolic decay of the exploration rate
//!
//! # Data Integrity
//!
//! Constructors validate inputs in debug builds and sanitize them in release
//! builds, so a schedule never produces NaN or a negative rate.

/// Learning rate scheduler trait.
///
/// Implementations provide step-dependent learning rates for training loops.
pub trait LRScheduler {
    /// Get the learning rate for a given step.
    fn get_lr(&self, step: usize) -> f64;
}

fn sanitize_lr(name: &str, lr: f64) -> f64 {
    debug_assert!(lr.is_finite(), "{}: lr must be finite, got {}", name, lr);
    debug_assert!(lr >= 0.0, "{}: lr must be non-negative, got {}", name, lr);
    if lr.is_finite() && lr >= 0.0 {
        lr
    } else {
        0.0
    }
}

/// Linear anneal over environment steps.
///
/// ```text
/// lr(steps) = lr * max(1 - (steps - 1) / anneal_steps, 1e-4)
/// ```
///
/// `steps` counts environment steps taken so far (the first learning call
/// usually happens with `steps >= 1`). `anneal_steps = 0` disables annealing.
#[derive(Debug, Clone)]
pub struct AnnealedLR {
    lr: f64,
    anneal_steps: usize,
}

impl AnnealedLR {
    /// Smallest fraction of the base rate ever returned.
    pub const FLOOR: f64 = 1e-4;

    pub fn new(lr: f64, anneal_steps: usize) -> Self {
        Self {
            lr: sanitize_lr("AnnealedLR", lr),
            anneal_steps,
        }
    }
}

impl LRScheduler for AnnealedLR {
    fn get_lr(&self, step: usize) -> f64 {
        if self.anneal_steps == 0 {
            return self.lr;
        }
        let progress = step.saturating_sub(1) as f64 / self.anneal_steps as f64;
        self.lr * (1.0 - progress).max(Self::FLOOR)
    }
}

/// Exploration rate halving every `half_life` steps at first.
///
/// ```text
/// eps(step) = init_eps * (1 - step / (step + half_life))
/// ```
#[derive(Debug, Clone)]
pub struct EpsilonDecay {
    init_eps: f32,
    half_life: usize,
}

impl EpsilonDecay {
    pub fn new(init_eps: f32, half_life: usize) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&init_eps),
            "EpsilonDecay: init_eps must be in [0, 1], got {}",
            init_eps
        );
        debug_assert!(half_life > 0, "EpsilonDecay: half_life must be > 0");
        Self {
            init_eps: if init_eps.is_finite() { init_eps.clamp(0.0, 1.0) } else { 0.0 },
            half_life: half_life.max(1),
        }
    }

    pub fn init_eps(&self) -> f32 {
        self.init_eps
    }

    pub fn get_eps(&self, step: usize) -> f32 {
        if self.init_eps <= 0.0 {
            return 0.0;
        }
        let step = step as f64;
        (self.init_eps as f64 * (1.0 - step / (step + self.half_life as f64))) as f32
    }
}
