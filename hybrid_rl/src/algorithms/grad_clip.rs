//! Global gradient-norm clipping with a hard failure on non-finite norms.
//!
//! ```text
//! norm = sqrt(sum_p ||g_p||^2)
//! g_p <- g_p * max_norm / (norm + 1e-6)   if norm > max_norm
//! ```
//!
//! The norm is computed over every float parameter of the module that
//! received a gradient. A NaN or infinite norm is reported before any
//! gradient is rescaled, so the caller can skip the optimizer step and leave
//! both parameters and optimizer state untouched.

use std::marker::PhantomData;

use burn::module::{AutodiffModule, ModuleVisitor, Param};
use burn::optim::GradientsParams;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;

use crate::error::{HybridRlError, Result};

// ============================================================================
// Visitors
// ============================================================================

/// Accumulates the squared L2 norm of every registered gradient.
struct GradNormVisitor<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    sum_sq: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradNormVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id) {
            let sq: f64 = grad.powf_scalar(2.0).sum().into_scalar().elem();
            self.sum_sq += sq;
        }
    }
}

/// Multiplies every registered gradient by `scale`.
struct GradScaleVisitor<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f32,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradScaleVisitor<'_, B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id) {
            self.grads.register(param.id, grad.mul_scalar(self.scale));
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Global L2 norm of the gradients of `module`.
pub fn global_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = GradNormVisitor::<B> {
        grads,
        sum_sq: 0.0,
        _backend: PhantomData,
    };
    module.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Check the global gradient norm and clip it to `max_norm` when given.
///
/// Returns the norm before clipping, or `NonFiniteGradient` when it is NaN or
/// infinite (gradients are left untouched in that case).
pub fn clip_grad_norm<B, M>(module: &M, grads: &mut GradientsParams, max_norm: Option<f32>) -> Result<f64>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let norm = global_grad_norm::<B, M>(module, grads);
    if !norm.is_finite() {
        return Err(HybridRlError::NonFiniteGradient { norm });
    }

    if let Some(max_norm) = max_norm {
        if norm > max_norm as f64 {
            let mut visitor = GradScaleVisitor::<B> {
                grads,
                scale: (max_norm as f64 / (norm + 1e-6)) as f32,
                _backend: PhantomData,
            };
            module.visit(&mut visitor);
        }
    }
    Ok(norm)
}
