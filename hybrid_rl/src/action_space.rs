//! Hybrid action space description.
//!
//! An action is a tuple of zero or more discrete choices (one per head, each
//! with its own cardinality) and zero or more bounded continuous values.
//!
//! ```text
//! discrete:   [head_0 in 0..4, head_1 in 0..5]
//! continuous: [a_0 in [0, 1], a_1 in [0, 2]]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{HybridRlError, Result};

/// Immutable description of a hybrid action space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpace {
    continuous_bounds: Vec<(f32, f32)>,
    discrete_cardinalities: Vec<usize>,
}

impl ActionSpace {
    /// Build a space from per-dimension bounds and per-head cardinalities.
    ///
    /// `min_actions` and `max_actions` must both have `continuous_dim` entries.
    pub fn new(
        continuous_dim: usize,
        min_actions: &[f32],
        max_actions: &[f32],
        discrete_cardinalities: Vec<usize>,
    ) -> Result<Self> {
        if continuous_dim == 0 && discrete_cardinalities.is_empty() {
            return Err(HybridRlError::config(
                "at least one continuous dimension or discrete head must be declared",
            ));
        }
        if min_actions.len() != continuous_dim || max_actions.len() != continuous_dim {
            return Err(HybridRlError::config(format!(
                "action bounds must have {} entries, got min={} max={}",
                continuous_dim,
                min_actions.len(),
                max_actions.len()
            )));
        }

        let mut continuous_bounds = Vec::with_capacity(continuous_dim);
        for (i, (&lo, &hi)) in min_actions.iter().zip(max_actions).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(HybridRlError::config(format!(
                    "continuous dimension {} has invalid bounds [{}, {}]",
                    i, lo, hi
                )));
            }
            continuous_bounds.push((lo, hi));
        }

        if let Some(head) = discrete_cardinalities.iter().position(|&n| n == 0) {
            return Err(HybridRlError::config(format!(
                "discrete head {} has cardinality 0",
                head
            )));
        }

        Ok(Self {
            continuous_bounds,
            discrete_cardinalities,
        })
    }

    /// Discrete-only space.
    pub fn discrete(cardinalities: Vec<usize>) -> Result<Self> {
        Self::new(0, &[], &[], cardinalities)
    }

    /// Continuous-only space.
    pub fn continuous(min_actions: &[f32], max_actions: &[f32]) -> Result<Self> {
        Self::new(min_actions.len(), min_actions, max_actions, Vec::new())
    }

    pub fn continuous_dim(&self) -> usize {
        self.continuous_bounds.len()
    }

    pub fn has_continuous(&self) -> bool {
        !self.continuous_bounds.is_empty()
    }

    pub fn has_discrete(&self) -> bool {
        !self.discrete_cardinalities.is_empty()
    }

    pub fn num_discrete_heads(&self) -> usize {
        self.discrete_cardinalities.len()
    }

    pub fn discrete_cardinalities(&self) -> &[usize] {
        &self.discrete_cardinalities
    }

    pub fn continuous_bounds(&self) -> &[(f32, f32)] {
        &self.continuous_bounds
    }

    pub fn min_actions(&self) -> Vec<f32> {
        self.continuous_bounds.iter().map(|&(lo, _)| lo).collect()
    }

    pub fn max_actions(&self) -> Vec<f32> {
        self.continuous_bounds.iter().map(|&(_, hi)| hi).collect()
    }

    /// Per-dimension midpoint `(max + min) / 2`.
    pub fn action_means(&self) -> Vec<f32> {
        self.continuous_bounds
            .iter()
            .map(|&(lo, hi)| (hi + lo) / 2.0)
            .collect()
    }

    /// Per-dimension width `max - min`.
    pub fn action_ranges(&self) -> Vec<f32> {
        self.continuous_bounds.iter().map(|&(lo, hi)| hi - lo).collect()
    }

    /// Total number of discrete logits across heads (flat mask width).
    pub fn total_discrete_logits(&self) -> usize {
        self.discrete_cardinalities.iter().sum()
    }

    /// Offset of each head inside a flat, head-ordered mask row.
    pub fn head_offsets(&self) -> Vec<usize> {
        self.discrete_cardinalities
            .iter()
            .scan(0, |acc, &n| {
                let offset = *acc;
                *acc += n;
                Some(offset)
            })
            .collect()
    }

    /// Check a flat mask row against the declared heads.
    ///
    /// Every head must keep at least one legal action.
    pub fn validate_mask(&self, mask: &[f32]) -> Result<()> {
        if mask.len() != self.total_discrete_logits() {
            return Err(HybridRlError::shape(format!(
                "action mask has {} entries, expected {}",
                mask.len(),
                self.total_discrete_logits()
            )));
        }
        for (head, (&offset, &n)) in self
            .head_offsets()
            .iter()
            .zip(&self.discrete_cardinalities)
            .enumerate()
        {
            if mask[offset..offset + n].iter().all(|&m| m == 0.0) {
                return Err(HybridRlError::InvalidAction(format!(
                    "action mask leaves head {} without a legal action",
                    head
                )));
            }
        }
        Ok(())
    }

    /// Check one stored discrete action row.
    pub fn validate_discrete(&self, actions: &[f32]) -> Result<()> {
        for (head, (&a, &n)) in actions.iter().zip(&self.discrete_cardinalities).enumerate() {
            if a < 0.0 || a.fract() != 0.0 || a as usize >= n {
                return Err(HybridRlError::InvalidAction(format!(
                    "discrete action {} is not an index of head {} (cardinality {})",
                    a, head, n
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hybrid() -> ActionSpace {
        ActionSpace::new(2, &[0.0, 0.0], &[1.0, 2.0], vec![4, 5]).unwrap()
    }

    #[test]
    fn test_derived_quantities() {
        let space = hybrid();
        assert_eq!(space.continuous_dim(), 2);
        assert_eq!(space.num_discrete_heads(), 2);
        assert_eq!(space.action_means(), vec![0.5, 1.0]);
        assert_eq!(space.action_ranges(), vec![1.0, 2.0]);
        assert_eq!(space.total_discrete_logits(), 9);
        assert_eq!(space.head_offsets(), vec![0, 4]);
    }

    #[test]
    fn test_rejects_empty_space() {
        let err = ActionSpace::new(0, &[], &[], vec![]).unwrap_err();
        assert!(matches!(err, HybridRlError::Config(_)));
    }

    #[test]
    fn test_rejects_bound_length_mismatch() {
        let err = ActionSpace::new(2, &[0.0], &[1.0, 2.0], vec![]).unwrap_err();
        assert!(matches!(err, HybridRlError::Config(_)));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(ActionSpace::continuous(&[1.0], &[0.0]).is_err());
        assert!(ActionSpace::continuous(&[0.0], &[f32::NAN]).is_err());
    }

    #[test]
    fn test_rejects_zero_cardinality() {
        assert!(ActionSpace::discrete(vec![3, 0]).is_err());
    }

    #[test]
    fn test_mask_validation() {
        let space = hybrid();
        let ok = vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        assert!(space.validate_mask(&ok).is_ok());

        let dead_head = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        assert!(space.validate_mask(&dead_head).is_err());

        assert!(space.validate_mask(&[1.0; 4]).is_err());
    }

    #[test]
    fn test_discrete_validation() {
        let space = hybrid();
        assert!(space.validate_discrete(&[3.0, 4.0]).is_ok());
        assert!(space.validate_discrete(&[4.0, 0.0]).is_err());
        assert!(space.validate_discrete(&[1.5, 0.0]).is_err());
        assert!(space.validate_discrete(&[-1.0, 0.0]).is_err());
    }
}
