//! Trajectory batches with named fields.
//!
//! A batch is a fixed-length sequence of transitions. Every field is stored
//! under a string name as row-major `f32` rows of a fixed width, either once
//! for all agents (*global*, e.g. `global_rewards`) or once per agent index.
//!
//! Learners never index fields directly: [`TrajectoryBatch::resolve`] maps the
//! learner's logical names through a [`BatchNameMap`], checks every width and
//! every stored action against the [`ActionSpace`], and hands back a
//! [`ResolvedBatch`] of borrowed views. All contract violations surface there,
//! before any tensor is built.

use std::collections::HashMap;

use crate::action_space::ActionSpace;
use crate::config::BatchNameMap;
use crate::error::{HybridRlError, Result};

/// Storage of one named field.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchField {
    /// Shared by every agent: `len * width` values.
    Global { data: Vec<f32>, width: usize },
    /// One `len * width` series per agent index.
    PerAgent { data: Vec<Vec<f32>>, width: usize },
}

/// Borrowed `[len, width]` rows of one field for one agent.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub data: &'a [f32],
    pub width: usize,
}

impl<'a> FieldView<'a> {
    pub fn row(&self, t: usize) -> &'a [f32] {
        &self.data[t * self.width..(t + 1) * self.width]
    }

    /// Rows `indices` concatenated.
    pub fn gather(&self, indices: &[usize]) -> Vec<f32> {
        indices.iter().flat_map(|&t| self.row(t).iter().copied()).collect()
    }
}

/// A trajectory of transitions stored by field name.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryBatch {
    fields: HashMap<String, BatchField>,
    terminated: Vec<bool>,
}

impl TrajectoryBatch {
    /// Empty batch whose length is fixed by the termination flags.
    pub fn new(terminated: Vec<bool>) -> Self {
        Self {
            fields: HashMap::new(),
            terminated,
        }
    }

    pub fn len(&self) -> usize {
        self.terminated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminated.is_empty()
    }

    pub fn terminated(&self) -> &[bool] {
        &self.terminated
    }

    fn check_len(&self, name: &str, data: &[f32], width: usize) -> Result<()> {
        if width == 0 || data.len() != self.len() * width {
            return Err(HybridRlError::shape(format!(
                "field '{}' has {} values, expected {} rows of width {}",
                name,
                data.len(),
                self.len(),
                width
            )));
        }
        Ok(())
    }

    /// Register a field shared by every agent.
    pub fn with_global(mut self, name: impl Into<String>, width: usize, data: Vec<f32>) -> Result<Self> {
        let name = name.into();
        self.check_len(&name, &data, width)?;
        self.fields.insert(name, BatchField::Global { data, width });
        Ok(self)
    }

    /// Register a field with one series per agent index.
    pub fn with_agent_field(
        mut self,
        name: impl Into<String>,
        width: usize,
        data: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let name = name.into();
        for series in &data {
            self.check_len(&name, series, width)?;
        }
        self.fields.insert(name, BatchField::PerAgent { data, width });
        Ok(self)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Rows of `name` for `agent`; `logical` names the learner's view of it.
    pub fn field(&self, name: &str, logical: &str, agent: usize) -> Result<FieldView<'_>> {
        match self.fields.get(name) {
            Some(BatchField::Global { data, width }) => Ok(FieldView { data, width: *width }),
            Some(BatchField::PerAgent { data, width }) => data
                .get(agent)
                .map(|series| FieldView {
                    data: series,
                    width: *width,
                })
                .ok_or_else(|| {
                    HybridRlError::shape(format!(
                        "field '{}' has {} agents, requested agent {}",
                        name,
                        data.len(),
                        agent
                    ))
                }),
            None => Err(HybridRlError::MissingField {
                field: name.to_string(),
                logical: logical.to_string(),
            }),
        }
    }

    fn field_with_width(&self, name: &str, logical: &str, agent: usize, width: usize) -> Result<FieldView<'_>> {
        let view = self.field(name, logical, agent)?;
        if view.width != width {
            return Err(HybridRlError::shape(format!(
                "field '{}' ({}) has width {}, expected {}",
                name, logical, view.width, width
            )));
        }
        Ok(view)
    }

    /// Resolve and validate every field a learner reads.
    ///
    /// Log-probability fields are only required when `needs_log_probs` is set.
    /// `values` is read from the name map's entry, or from a field literally
    /// called `values` when the map declares none.
    pub fn resolve<'a>(
        &'a self,
        names: &BatchNameMap,
        space: &ActionSpace,
        obs_dim: usize,
        agent: usize,
        needs_log_probs: bool,
    ) -> Result<ResolvedBatch<'a>> {
        if self.is_empty() {
            return Err(HybridRlError::shape("batch has no transitions"));
        }

        let obs = self.field_with_width(&names.obs, "obs", agent, obs_dim)?;
        let next_obs = self.field_with_width(&names.next_obs, "obs_", agent, obs_dim)?;
        let rewards = self.field_with_width(&names.rewards, "rewards", agent, 1)?;

        let mut discrete_actions = None;
        let mut discrete_log_probs = None;
        if space.has_discrete() {
            let heads = space.num_discrete_heads();
            let name = names.discrete_actions.as_deref().unwrap_or("discrete_actions");
            let view = self.field_with_width(name, "discrete_actions", agent, heads)?;
            for t in 0..self.len() {
                space.validate_discrete(view.row(t))?;
            }
            discrete_actions = Some(view);

            if needs_log_probs {
                let name = names.discrete_log_probs.as_deref().unwrap_or("discrete_log_probs");
                discrete_log_probs = Some(self.field_with_width(name, "discrete_log_probs", agent, heads)?);
            }
        }

        let mut continuous_actions = None;
        let mut continuous_log_probs = None;
        if space.has_continuous() {
            let name = names.continuous_actions.as_deref().unwrap_or("continuous_actions");
            continuous_actions = Some(self.field_with_width(
                name,
                "continuous_actions",
                agent,
                space.continuous_dim(),
            )?);

            if needs_log_probs {
                let name = names.continuous_log_probs.as_deref().unwrap_or("continuous_log_probs");
                continuous_log_probs = Some(self.field_with_width(name, "continuous_log_probs", agent, 1)?);
            }
        }

        let values = match names.values.as_deref() {
            Some(name) => Some(self.field_with_width(name, "values", agent, 1)?),
            None if self.has_field("values") => Some(self.field_with_width("values", "values", agent, 1)?),
            None => None,
        };

        let mask_name = names
            .action_mask
            .as_deref()
            .or_else(|| self.has_field("action_mask").then_some("action_mask"));
        let action_mask = match mask_name {
            Some(name) if space.has_discrete() => {
                let view = self.field_with_width(name, "action_mask", agent, space.total_discrete_logits())?;
                for t in 0..self.len() {
                    space.validate_mask(view.row(t))?;
                }
                Some(view)
            }
            _ => None,
        };

        Ok(ResolvedBatch {
            len: self.len(),
            obs,
            next_obs,
            rewards: rewards.data,
            terminated: &self.terminated,
            discrete_actions,
            continuous_actions,
            discrete_log_probs,
            continuous_log_probs,
            values,
            action_mask,
        })
    }
}

/// Validated views of one agent's trajectory.
#[derive(Debug, Clone)]
pub struct ResolvedBatch<'a> {
    pub len: usize,
    pub obs: FieldView<'a>,
    pub next_obs: FieldView<'a>,
    pub rewards: &'a [f32],
    pub terminated: &'a [bool],
    pub discrete_actions: Option<FieldView<'a>>,
    pub continuous_actions: Option<FieldView<'a>>,
    pub discrete_log_probs: Option<FieldView<'a>>,
    pub continuous_log_probs: Option<FieldView<'a>>,
    pub values: Option<FieldView<'a>>,
    pub action_mask: Option<FieldView<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ActionSpace {
        ActionSpace::new(1, &[0.0], &[1.0], vec![3]).unwrap()
    }

    fn batch() -> TrajectoryBatch {
        TrajectoryBatch::new(vec![false, true])
            .with_agent_field("obs", 2, vec![vec![0.0, 1.0, 2.0, 3.0]])
            .unwrap()
            .with_agent_field("obs_", 2, vec![vec![2.0, 3.0, 4.0, 5.0]])
            .unwrap()
            .with_global("global_rewards", 1, vec![1.0, -1.0])
            .unwrap()
            .with_agent_field("discrete_actions", 1, vec![vec![0.0, 2.0]])
            .unwrap()
            .with_agent_field("continuous_actions", 1, vec![vec![0.2, 0.9]])
            .unwrap()
            .with_agent_field("discrete_log_probs", 1, vec![vec![-1.0, -1.1]])
            .unwrap()
            .with_agent_field("continuous_log_probs", 1, vec![vec![-0.5, -0.4]])
            .unwrap()
    }

    #[test]
    fn test_resolve_default_names() {
        let b = batch();
        let resolved = b.resolve(&BatchNameMap::default(), &space(), 2, 0, true).unwrap();
        assert_eq!(resolved.len, 2);
        assert_eq!(resolved.obs.row(1), &[2.0, 3.0]);
        assert_eq!(resolved.rewards, &[1.0, -1.0]);
        assert_eq!(resolved.terminated, &[false, true]);
        assert!(resolved.values.is_none());
        assert!(resolved.action_mask.is_none());
    }

    #[test]
    fn test_resolve_detects_literal_values_and_mask() {
        let b = batch()
            .with_agent_field("values", 1, vec![vec![0.5, 0.25]])
            .unwrap()
            .with_agent_field("action_mask", 3, vec![vec![1.0, 0.0, 1.0, 0.0, 1.0, 1.0]])
            .unwrap();
        let resolved = b.resolve(&BatchNameMap::default(), &space(), 2, 0, true).unwrap();
        assert_eq!(resolved.values.map(|v| v.data), Some(&[0.5, 0.25][..]));
        let mask = resolved.action_mask.unwrap();
        assert_eq!(mask.row(0), &[1.0, 0.0, 1.0]);
        assert_eq!(mask.row(1), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_literal_mask_is_validated() {
        let b = batch()
            .with_agent_field("action_mask", 3, vec![vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]])
            .unwrap();
        let err = b.resolve(&BatchNameMap::default(), &space(), 2, 0, true).unwrap_err();
        assert!(matches!(err, HybridRlError::InvalidAction(_)));
    }

    #[test]
    fn test_missing_field_names_logical_role() {
        let b = batch();
        let names = BatchNameMap::default().with_rewards("team_rewards");
        let err = b.resolve(&names, &space(), 2, 0, true).unwrap_err();
        assert!(matches!(
            err,
            HybridRlError::MissingField { ref field, ref logical } if field == "team_rewards" && logical == "rewards"
        ));
    }

    #[test]
    fn test_width_mismatch_is_shape_error() {
        let err = batch().resolve(&BatchNameMap::default(), &space(), 3, 0, true).unwrap_err();
        assert!(matches!(err, HybridRlError::Shape(_)));
    }

    #[test]
    fn test_out_of_range_discrete_action_rejected() {
        let b = batch()
            .with_agent_field("discrete_actions", 1, vec![vec![0.0, 3.0]])
            .unwrap();
        let err = b.resolve(&BatchNameMap::default(), &space(), 2, 0, true).unwrap_err();
        assert!(matches!(err, HybridRlError::InvalidAction(_)));
    }

    #[test]
    fn test_unknown_agent_index() {
        let err = batch().resolve(&BatchNameMap::default(), &space(), 2, 1, true).unwrap_err();
        assert!(matches!(err, HybridRlError::Shape(_)));
    }

    #[test]
    fn test_registration_checks_length() {
        assert!(TrajectoryBatch::new(vec![false; 3])
            .with_global("global_rewards", 1, vec![0.0; 2])
            .is_err());
    }

    #[test]
    fn test_values_and_mask_fields() {
        let b = batch()
            .with_agent_field("values", 1, vec![vec![0.5, 0.25]])
            .unwrap()
            .with_agent_field("legal", 3, vec![vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0]])
            .unwrap();
        let names = BatchNameMap::default().with_action_mask("legal");
        let resolved = b.resolve(&names, &space(), 2, 0, false).unwrap();
        assert_eq!(resolved.values.unwrap().data, &[0.5, 0.25]);
        assert_eq!(resolved.action_mask.unwrap().row(1), &[0.0, 0.0, 1.0]);
        assert!(resolved.discrete_log_probs.is_none());
    }

    #[test]
    fn test_field_view_helpers() {
        let b = batch();
        let obs = b.field("obs", "obs", 0).unwrap();
        assert_eq!(obs.gather(&[1, 0]), vec![2.0, 3.0, 0.0, 1.0]);
        assert_eq!(obs.row(1), &[2.0, 3.0]);
    }
}
