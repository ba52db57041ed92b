//! Temporal-difference targets of the Q-learning family.
//!
//! All three variants share one bootstrapped form per head:
//!
//! ```text
//! greedy:     y = r + gamma (1 - d) max_a' Q(s', a')
//! soft:       y = r + gamma (1 - d) sum_a' p'(a') (Q(s', a') - tau log p'(a'))
//! munchausen: y = soft + m tau log pi(a | s)
//! ```
//!
//! with `p' = softmax(Q(s', .))` and `pi = softmax(Q(s, .))`. Targets are
//! computed on the inner (non-differentiable) backend.

use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};

use crate::action_space::ActionSpace;
use crate::config::DqnVariant;

// ============================================================================
// Continuous discretization
// ============================================================================

/// Maps continuous actions to and from `n_bins` evenly spaced bins per dimension.
#[derive(Debug, Clone)]
pub struct Discretizer {
    means: Vec<f32>,
    ranges: Vec<f32>,
    n_bins: usize,
}

impl Discretizer {
    pub fn new(space: &ActionSpace, n_bins: usize) -> Self {
        Self {
            means: space.action_means(),
            ranges: space.action_ranges(),
            n_bins,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Distance between neighbouring bin centres of dimension `dim`.
    pub fn bin_width(&self, dim: usize) -> f32 {
        self.ranges[dim] / (self.n_bins - 1) as f32
    }

    /// Row-major actions `[batch * dim]` to bin indices.
    ///
    /// `bin = clamp(round(((a - mean) / range + 0.5)(n - 1)), 0, n - 1)`
    pub fn discretize(&self, actions: &[f32]) -> Vec<usize> {
        let top = (self.n_bins - 1) as f32;
        actions
            .iter()
            .enumerate()
            .map(|(i, &a)| {
                let d = i % self.means.len();
                let bin = (((a - self.means[d]) / self.ranges[d] + 0.5) * top).round();
                bin.clamp(0.0, top) as usize
            })
            .collect()
    }

    /// Inverse of [`discretize`](Self::discretize) on bin centres.
    pub fn undiscretize(&self, bins: &[usize]) -> Vec<f32> {
        let top = (self.n_bins - 1) as f32;
        bins.iter()
            .enumerate()
            .map(|(i, &b)| {
                let d = i % self.means.len();
                (b as f32 / top - 0.5) * self.ranges[d] + self.means[d]
            })
            .collect()
    }
}

// ============================================================================
// Targets
// ============================================================================

/// `max_a' Q(s', a')` per row.
pub fn greedy_next_value<B: Backend>(next_q: Tensor<B, 2>) -> Tensor<B, 1> {
    next_q.max_dim(1).flatten(0, 1)
}

/// `sum p' (Q' - tau log p')` per row.
pub fn soft_next_value<B: Backend>(next_q: Tensor<B, 2>, tau: f32) -> Tensor<B, 1> {
    let log_p = log_softmax(next_q.clone(), 1);
    let p = softmax(next_q.clone(), 1);
    (p * (next_q - log_p.mul_scalar(tau))).sum_dim(1).flatten(0, 1)
}

/// `scale * tau * log pi(a | s)` per row, `pi = softmax(Q(s, .))`.
pub fn munchausen_bonus<B: Backend>(
    q: Tensor<B, 2>,
    actions: Tensor<B, 2, Int>,
    scale: f32,
    tau: f32,
) -> Tensor<B, 1> {
    log_softmax(q, 1)
        .gather(1, actions)
        .flatten(0, 1)
        .mul_scalar(scale * tau)
}

/// Per-head TD target of one variant.
///
/// # Arguments
///
/// * `rewards` - [batch]
/// * `discounts` - `gamma (1 - d)`: [batch]
/// * `next_q` - `Q(s', .)` of this head: [batch, n]
/// * `q` - `Q(s, .)` of this head, detached: [batch, n]
/// * `actions` - taken indices: [batch, 1]
pub fn td_target<B: Backend>(
    variant: DqnVariant,
    rewards: Tensor<B, 1>,
    discounts: Tensor<B, 1>,
    next_q: Tensor<B, 2>,
    q: Tensor<B, 2>,
    actions: Tensor<B, 2, Int>,
    tau: f32,
    munchausen: f32,
) -> Tensor<B, 1> {
    match variant {
        DqnVariant::Greedy => rewards + discounts * greedy_next_value(next_q),
        DqnVariant::Soft => rewards + discounts * soft_next_value(next_q, tau),
        DqnVariant::Munchausen => {
            rewards
                + munchausen_bonus(q, actions, munchausen, tau)
                + discounts * soft_next_value(next_q, tau)
        }
    }
}

// ============================================================================
// Expected value
// ============================================================================

/// `(1 - eps) best + eps * mean(other actions)` for one head's Q row.
///
/// With a mask, only legal actions count; a single legal action yields `best`.
pub fn expected_head_value(q: &[f32], mask: Option<&[f32]>, eps: f32) -> f32 {
    let legal: Vec<f32> = match mask {
        Some(mask) => q
            .iter()
            .zip(mask)
            .filter(|(_, &m)| m != 0.0)
            .map(|(&v, _)| v)
            .collect(),
        None => q.to_vec(),
    };
    let Some((best_idx, best)) = legal
        .iter()
        .copied()
        .enumerate()
        .fold(None, |acc: Option<(usize, f32)>, (i, v)| match acc {
            Some((_, b)) if b >= v => acc,
            _ => Some((i, v)),
        })
    else {
        return 0.0;
    };
    if legal.len() == 1 {
        return best;
    }
    let others = legal
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != best_idx)
        .map(|(_, v)| v)
        .sum::<f32>()
        / (legal.len() - 1) as f32;
    (1.0 - eps) * best + eps * others
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::distribution::index_column;
    use burn::backend::NdArray;
    use proptest::prelude::*;

    type TestBackend = NdArray<f32>;

    fn to_vec(t: Tensor<TestBackend, 1>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    fn discretizer(n_bins: usize) -> Discretizer {
        let space = ActionSpace::continuous(&[0.0, -3.0], &[1.0, 5.0]).unwrap();
        Discretizer::new(&space, n_bins)
    }

    #[test]
    fn test_discretize_endpoints() {
        let d = discretizer(5);
        assert_eq!(d.discretize(&[0.0, -3.0, 1.0, 5.0]), vec![0, 0, 4, 4]);
        assert_eq!(d.discretize(&[-10.0, 50.0]), vec![0, 4]);
        assert_eq!(d.undiscretize(&[0, 4, 2, 2]), vec![0.0, 5.0, 0.5, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_round_trip_within_one_bin(
            a0 in 0.0f32..=1.0,
            a1 in -3.0f32..=5.0,
            n_bins in 2usize..40,
        ) {
            let d = discretizer(n_bins);
            let back = d.undiscretize(&d.discretize(&[a0, a1]));
            prop_assert!((back[0] - a0).abs() <= d.bin_width(0) + 1e-5);
            prop_assert!((back[1] - a1).abs() <= d.bin_width(1) + 1e-5);
        }
    }

    #[test]
    fn test_greedy_target() {
        let device = Default::default();
        let next_q = Tensor::<TestBackend, 2>::from_floats([[1.0, 3.0], [2.0, 0.0]], &device);
        let y = td_target(
            DqnVariant::Greedy,
            Tensor::from_floats([1.0, 1.0], &device),
            Tensor::from_floats([0.5, 0.0], &device),
            next_q.clone(),
            next_q,
            index_column(&[0, 0], &device),
            0.0,
            0.0,
        );
        assert_eq!(to_vec(y), vec![2.5, 1.0]);
    }

    #[test]
    fn test_soft_value_of_uniform_q() {
        let device = Default::default();
        // p' uniform over 4: sum p (q - tau log p) = q + tau ln 4
        let next_q = Tensor::<TestBackend, 2>::from_floats([[2.0, 2.0, 2.0, 2.0]], &device);
        let v = to_vec(soft_next_value(next_q, 0.5))[0];
        assert!((v - (2.0 + 0.5 * 4.0f32.ln())).abs() < 1e-5);
    }

    #[test]
    fn test_munchausen_zero_equals_soft() {
        let device = Default::default();
        let q = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.7, -0.3], [1.0, 0.0, 0.5]], &device);
        let next_q = Tensor::<TestBackend, 2>::from_floats([[0.4, 0.2, 0.9], [-1.0, 2.0, 0.0]], &device);
        let rewards = Tensor::<TestBackend, 1>::from_floats([1.0, -1.0], &device);
        let discounts = Tensor::<TestBackend, 1>::from_floats([0.99, 0.0], &device);
        let actions = index_column(&[1, 2], &device);

        let soft = td_target(
            DqnVariant::Soft,
            rewards.clone(),
            discounts.clone(),
            next_q.clone(),
            q.clone(),
            actions.clone(),
            0.1,
            0.0,
        );
        let munchausen = td_target(
            DqnVariant::Munchausen,
            rewards,
            discounts,
            next_q,
            q,
            actions,
            0.1,
            0.0,
        );
        for (a, b) in to_vec(soft).iter().zip(to_vec(munchausen)) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_munchausen_bonus_is_non_positive() {
        let device = Default::default();
        let q = Tensor::<TestBackend, 2>::from_floats([[0.1, 0.7, -0.3]], &device);
        let bonus = to_vec(munchausen_bonus(q, index_column(&[2], &device), 0.9, 0.1))[0];
        assert!(bonus < 0.0);
    }

    #[test]
    fn test_expected_head_value() {
        let q = [1.0, 3.0, 2.0];
        assert!((expected_head_value(&q, None, 0.0) - 3.0).abs() < 1e-6);
        assert!((expected_head_value(&q, None, 0.5) - (1.5 + 0.75)).abs() < 1e-6);

        // best legal is 2.0, the only other legal action is 1.0
        let mask = [1.0, 0.0, 1.0];
        assert!((expected_head_value(&q, Some(&mask), 0.5) - 1.5).abs() < 1e-6);

        let single = [0.0, 1.0, 0.0];
        assert!((expected_head_value(&q, Some(&single), 0.5) - 3.0).abs() < 1e-6);
    }
}
