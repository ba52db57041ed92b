//! Linear layer with selectable initialization.
//!
//! Every network in the crate is built from [`InitLinear`]. With
//! `orthogonal = true` the weight matrix has orthonormal rows (or columns for
//! tall matrices) scaled by `gain`, and the bias starts at zero. Otherwise
//! weights and bias are drawn from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
//!
//! # Gain values
//!
//! - sqrt(2): hidden layers
//! - 0.01: policy heads (near-uniform initial policy)
//! - 1.0: value heads

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;

/// Gain for hidden layers.
pub const HIDDEN_GAIN: f64 = std::f64::consts::SQRT_2;
/// Gain for policy (logit / mean) heads.
pub const POLICY_GAIN: f64 = 0.01;
/// Gain for value and Q heads.
pub const VALUE_GAIN: f64 = 1.0;

/// Configuration for [`InitLinear`].
#[derive(Debug, Clone)]
pub struct InitLinearConfig {
    pub d_input: usize,
    pub d_output: usize,
    /// Scale of the orthogonal weights (ignored for uniform init).
    pub gain: f64,
    pub orthogonal: bool,
}

impl InitLinearConfig {
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_output,
            gain: 1.0,
            orthogonal: true,
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_orthogonal(mut self, orthogonal: bool) -> Self {
        self.orthogonal = orthogonal;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> InitLinear<B> {
        let (weight, bias) = if self.orthogonal {
            (
                orthogonal_weights::<B>(self.d_output, self.d_input, self.gain, device),
                Tensor::zeros([self.d_output], device),
            )
        } else {
            let bound = 1.0 / (self.d_input.max(1) as f64).sqrt();
            let dist = Distribution::Uniform(-bound, bound);
            (
                Tensor::random([self.d_output, self.d_input], dist, device),
                Tensor::random([self.d_output], dist, device),
            )
        };

        InitLinear {
            weight: Param::from_tensor(weight),
            bias: Param::from_tensor(bias),
        }
    }
}

/// `y = x W^T + b` with weight of shape `[d_output, d_input]`.
#[derive(Module, Debug)]
pub struct InitLinear<B: Backend> {
    pub weight: Param<Tensor<B, 2>>,
    pub bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> InitLinear<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.weight.val().transpose()) + self.bias.val().unsqueeze_dim(0)
    }

    pub fn d_output(&self) -> usize {
        self.weight.val().dims()[0]
    }
}

/// Orthogonal matrix of shape `[rows, cols]` scaled by `gain`.
///
/// A Gaussian matrix is orthonormalized with modified Gram-Schmidt along its
/// shorter side, so `W W^T = gain^2 I` for wide and square matrices and
/// `W^T W = gain^2 I` for tall ones.
pub fn orthogonal_weights<B: Backend>(
    rows: usize,
    cols: usize,
    gain: f64,
    device: &B::Device,
) -> Tensor<B, 2> {
    // Work on vectors of length `long`, `short` of them.
    let (short, long) = if rows <= cols { (rows, cols) } else { (cols, rows) };
    let random: Vec<f32> = Tensor::<B, 2>::random([short, long], Distribution::Normal(0.0, 1.0), device)
        .into_data()
        .iter::<f32>()
        .collect();

    let mut vectors: Vec<Vec<f32>> = random.chunks(long).map(|c| c.to_vec()).collect();
    for i in 0..short {
        for j in 0..i {
            let (done, rest) = vectors.split_at_mut(i);
            let dot: f32 = rest[0].iter().zip(&done[j]).map(|(a, b)| a * b).sum();
            for (v, u) in rest[0].iter_mut().zip(&done[j]) {
                *v -= dot * u;
            }
        }
        let norm = vectors[i].iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 1e-10 {
            vectors[i].iter_mut().for_each(|v| *v /= norm);
        } else {
            // Degenerate draw: fall back to a unit basis vector.
            vectors[i].iter_mut().for_each(|v| *v = 0.0);
            vectors[i][i] = 1.0;
        }
    }

    let flat: Vec<f32> = vectors
        .into_iter()
        .flatten()
        .map(|v| v * gain as f32)
        .collect();
    let matrix = Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([short, long]);

    if rows <= cols {
        matrix
    } else {
        matrix.transpose()
    }
}
