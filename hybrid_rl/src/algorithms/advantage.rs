//! Returns and advantages for the policy-gradient learner.
//!
//! Five estimators are supported (see [`AdvantageType`]):
//!
//! - `g`: discounted Monte-Carlo return, `A = G`
//! - `gv`: `A = G - V(s)`
//! - `constant`: `A = G - g_mean`, with `g_mean` an EMA of past mean returns
//! - `gae`: generalized advantage estimation, `G = A + V`
//! - `a2c`: GAE with `lambda = 0`
//!
//! A terminal flag at step `t` cuts every recursion at `t`: nothing from
//! `t + 1` (or from the bootstrap value) leaks into `G[t]` or `A[t]`.
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

use crate::config::AdvantageType;

/// Discounted returns with a bootstrap value for the step after the last one.
///
/// `G[T-1] = r[T-1] + gamma (1 - d[T-1]) bootstrap`,
/// `G[t] = r[t] + gamma (1 - d[t]) G[t+1]`.
pub fn monte_carlo_returns(rewards: &[f32], terminated: &[bool], bootstrap: f32, gamma: f32) -> Vec<f32> {
    debug_assert_eq!(rewards.len(), terminated.len());

    let mut returns = vec![0.0f32; rewards.len()];
    let mut next = bootstrap;
    for t in (0..rewards.len()).rev() {
        let not_done = if terminated[t] { 0.0 } else { 1.0 };
        next = rewards[t] + gamma * not_done * next;
        returns[t] = next;
    }
    returns
}

/// GAE advantages and returns for a single trajectory.
///
/// # Arguments
///
/// * `rewards` - rewards received [T]
/// * `values` - value estimates V(s) [T]
/// * `terminated` - termination flags [T]
/// * `bootstrap` - V(s_T)
///
/// # Returns
///
/// (advantages, returns) - both [T]
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    terminated: &[bool],
    bootstrap: f32,
    gamma: f32,
    gae_lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    debug_assert_eq!(values.len(), n);
    debug_assert_eq!(terminated.len(), n);

    let mut advantages = vec![0.0f32; n];
    let mut returns = vec![0.0f32; n];

    let mut gae = 0.0f32;
    let mut next_value = bootstrap;

    for t in (0..n).rev() {
        let not_done = if terminated[t] { 0.0 } else { 1.0 };

        let delta = rewards[t] + gamma * next_value * not_done - values[t];
        gae = delta + gamma * gae_lambda * not_done * gae;

        advantages[t] = gae;
        returns[t] = gae + values[t];
        next_value = values[t];
    }

    (advantages, returns)
}

/// Normalize to zero mean and unit sample standard deviation.
///
/// Fewer than two elements normalize to zeros.
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.len() < 2 {
        advantages.iter_mut().for_each(|a| *a = 0.0);
        return;
    }

    let n = advantages.len() as f32;
    let mean = advantages.iter().sum::<f32>() / n;
    let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1.0);
    let std = variance.sqrt() + 1e-8;

    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}

/// Stateful estimator owning the constant-baseline EMA.
#[derive(Debug, Clone)]
pub struct AdvantageEstimator {
    pub advantage_type: AdvantageType,
    pub gamma: f32,
    pub gae_lambda: f32,
    /// EMA of mean returns, used by [`AdvantageType::Constant`].
    pub g_mean: f32,
}

impl AdvantageEstimator {
    pub fn new(advantage_type: AdvantageType, gamma: f32, gae_lambda: f32) -> Self {
        Self {
            advantage_type,
            gamma,
            gae_lambda,
            g_mean: 0.0,
        }
    }

    /// Compute `(returns, advantages)` for one trajectory.
    ///
    /// `values` holds the per-step baseline (critic or precomputed values);
    /// `g` and `constant` ignore it.
    pub fn estimate(
        &mut self,
        rewards: &[f32],
        terminated: &[bool],
        values: &[f32],
        bootstrap: f32,
    ) -> (Vec<f32>, Vec<f32>) {
        match self.advantage_type {
            AdvantageType::G => {
                let g = monte_carlo_returns(rewards, terminated, bootstrap, self.gamma);
                (g.clone(), g)
            }
            AdvantageType::Gv => {
                let g = monte_carlo_returns(rewards, terminated, bootstrap, self.gamma);
                let adv = g.iter().zip(values).map(|(g, v)| g - v).collect();
                (g, adv)
            }
            AdvantageType::Constant => {
                let g = monte_carlo_returns(rewards, terminated, bootstrap, self.gamma);
                if !g.is_empty() {
                    let mean = g.iter().sum::<f32>() / g.len() as f32;
                    self.g_mean = 0.9 * self.g_mean + 0.1 * mean;
                }
                let adv = g.iter().map(|g| g - self.g_mean).collect();
                (g, adv)
            }
            AdvantageType::Gae => {
                let (adv, g) =
                    compute_gae(rewards, values, terminated, bootstrap, self.gamma, self.gae_lambda);
                (g, adv)
            }
            AdvantageType::A2c => {
                let (adv, g) = compute_gae(rewards, values, terminated, bootstrap, self.gamma, 0.0);
                (g, adv)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: &[f32], b: &[f32], tol: f32) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol * (1.0 + y.abs()))
    }

    #[test]
    fn test_monte_carlo_simple() {
        let g = monte_carlo_returns(&[1.0, 1.0, 1.0], &[false, false, false], 10.0, 0.5);
        assert!(close(&g, &[1.0 + 0.5 * (1.0 + 0.5 * (1.0 + 5.0)), 1.0 + 0.5 * 6.0, 6.0], 1e-6));
    }

    #[test]
    fn test_monte_carlo_terminal_ignores_bootstrap() {
        let g = monte_carlo_returns(&[1.0, 2.0], &[false, true], 100.0, 0.9);
        assert_eq!(g, vec![1.0 + 0.9 * 2.0, 2.0]);
    }

    #[test]
    fn test_gae_single_step() {
        let (adv, ret) = compute_gae(&[1.0], &[0.5], &[false], 2.0, 0.9, 0.95);
        let delta = 1.0 + 0.9 * 2.0 - 0.5;
        assert!((adv[0] - delta).abs() < 1e-6);
        assert!((ret[0] - (delta + 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_sample_std() {
        let mut adv = vec![1.0, 3.0];
        normalize_advantages(&mut adv);
        // mean 2, sample std sqrt(2)
        let expected = 1.0 / 2.0f32.sqrt();
        assert!((adv[0] + expected).abs() < 1e-5);
        assert!((adv[1] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_degenerate_inputs() {
        let mut empty: Vec<f32> = vec![];
        normalize_advantages(&mut empty);
        let mut single = vec![5.0];
        normalize_advantages(&mut single);
        assert_eq!(single, vec![0.0]);
        let mut constant = vec![2.0; 4];
        normalize_advantages(&mut constant);
        assert!(constant.iter().all(|a| a.abs() < 1e-3));
    }

    #[test]
    fn test_constant_baseline_ema() {
        let mut est = AdvantageEstimator::new(AdvantageType::Constant, 0.0, 0.95);
        let (g, adv) = est.estimate(&[2.0, 4.0], &[false, false], &[0.0, 0.0], 0.0);
        assert_eq!(g, vec![2.0, 4.0]);
        assert!((est.g_mean - 0.3).abs() < 1e-6);
        assert!(close(&adv, &[1.7, 3.7], 1e-6));
    }

    #[test]
    fn test_gv_subtracts_values() {
        let mut est = AdvantageEstimator::new(AdvantageType::Gv, 0.0, 0.95);
        let (_, adv) = est.estimate(&[1.0, 2.0], &[false, false], &[0.5, 0.5], 0.0);
        assert_eq!(adv, vec![0.5, 1.5]);
    }

    fn trajectory() -> impl Strategy<Value = (Vec<f32>, Vec<f32>, Vec<bool>)> {
        (1usize..12).prop_flat_map(|n| {
            (
                prop::collection::vec(-5.0f32..5.0, n),
                prop::collection::vec(-5.0f32..5.0, n),
                prop::collection::vec(any::<bool>(), n),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_terminal_cuts_future(
            (rewards, values, mut terminated) in trajectory(),
            bootstrap in -5.0f32..5.0,
            bumped in -50.0f32..50.0,
            t in 0usize..12,
        ) {
            let n = rewards.len();
            let t = t % n;
            terminated[t] = true;

            // Anything after t (rewards, values, bootstrap) must not matter at t.
            let mut future_rewards = rewards.clone();
            let mut future_values = values.clone();
            for i in (t + 1)..n {
                future_rewards[i] += bumped;
                future_values[i] -= bumped;
            }

            let g_a = monte_carlo_returns(&rewards, &terminated, bootstrap, 0.9);
            let g_b = monte_carlo_returns(&future_rewards, &terminated, bootstrap + bumped, 0.9);
            prop_assert!((g_a[t] - g_b[t]).abs() < 1e-4);

            let (a_a, _) = compute_gae(&rewards, &values, &terminated, bootstrap, 0.9, 0.95);
            let (a_b, _) = compute_gae(&future_rewards, &future_values, &terminated, bootstrap + bumped, 0.9, 0.95);
            prop_assert!((a_a[t] - a_b[t]).abs() < 1e-4);
        }

        #[test]
        fn prop_gae_lambda_zero_is_a2c(
            (rewards, values, terminated) in trajectory(),
            bootstrap in -5.0f32..5.0,
        ) {
            let (gae, _) = compute_gae(&rewards, &values, &terminated, bootstrap, 0.9, 0.0);
            let mut est = AdvantageEstimator::new(AdvantageType::A2c, 0.9, 0.95);
            let (_, a2c) = est.estimate(&rewards, &terminated, &values, bootstrap);
            prop_assert!(close(&gae, &a2c, 1e-6));
        }

        #[test]
        fn prop_gae_lambda_one_is_mc_minus_baseline(
            (rewards, values, terminated) in trajectory(),
            bootstrap in -5.0f32..5.0,
        ) {
            let (gae, _) = compute_gae(&rewards, &values, &terminated, bootstrap, 0.9, 1.0);
            let g = monte_carlo_returns(&rewards, &terminated, bootstrap, 0.9);
            let expected: Vec<f32> = g.iter().zip(&values).map(|(g, v)| g - v).collect();
            prop_assert!(close(&gae, &expected, 1e-4));
        }
    }
}
