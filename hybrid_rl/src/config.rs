//! Hyperparameter configuration for the policy-gradient and DQN agents.
//!
//! Both configs are plain serde structs. They are validated once when an agent
//! is built and written verbatim into checkpoints, so that `load` can rebuild
//! networks of the right shape before reading their weights.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action_space::ActionSpace;

// ============================================================================
// Errors
// ============================================================================

/// Configuration validation error.
///
/// Returned when parameters are invalid or inconsistent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter (n_epochs, mini_batch_size, ...) must be positive.
    #[error("{field} must be > 0, got {value}")]
    InvalidCount { field: &'static str, value: usize },
    /// A parameter is outside its valid range.
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// A string option did not name a known variant.
    #[error("invalid {kind} '{value}', expected one of {expected}")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Anything else (action space shape, missing batch names, ...).
    #[error("{0}")]
    Invalid(String),
}

fn check_count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidCount { field, value });
    }
    Ok(())
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

// ============================================================================
// Enumerated options
// ============================================================================

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ConfigError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: concat!($($text, " "),+),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = match self {
                    $($name::$variant => $text,)+
                };
                f.write_str(text)
            }
        }
    };
}

/// Hidden-layer activation of the feed-forward encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
    None,
}

string_enum!(Activation, "activation", {
    Relu => "relu",
    Tanh => "tanh",
    Sigmoid => "sigmoid",
    None => "none",
});

/// How the policy-gradient learner turns returns into advantages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvantageType {
    /// Discounted Monte-Carlo return, no baseline.
    G,
    /// Monte-Carlo return minus the critic.
    Gv,
    /// Monte-Carlo return minus an EMA of past returns.
    Constant,
    /// Generalized advantage estimation.
    #[default]
    Gae,
    /// One-step TD (GAE with lambda = 0).
    A2c,
}

string_enum!(AdvantageType, "advantage type", {
    G => "g",
    Gv => "gv",
    Constant => "constant",
    Gae => "gae",
    A2c => "a2c",
});

/// Parameterization of the continuous log standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdType {
    /// One learned vector, independent of the state.
    #[default]
    Stateless,
    /// The actor outputs one log-std shared by all dimensions.
    Diagonal,
    /// The actor outputs one log-std per dimension.
    Full,
}

string_enum!(StdType, "std type", {
    Stateless => "stateless",
    Diagonal => "diagonal",
    Full => "full",
});

/// How continuous actions and log-stds are kept inside their ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionClampType {
    /// Squash through tanh and rescale (with Jacobian correction).
    #[default]
    Tanh,
    /// Hard clip into bounds, plain Gaussian log-density.
    Clamp,
}

string_enum!(ActionClampType, "action clamp type", {
    Tanh => "tanh",
    Clamp => "clamp",
});

/// Training-time action selection of the value-based agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSelectionMode {
    /// Uniform random with probability eps, otherwise argmax.
    #[default]
    EpsilonGreedy,
    /// Sample from softmax(Q) per head.
    Softmax,
}

string_enum!(ActionSelectionMode, "action selection mode", {
    EpsilonGreedy => "epsilon_greedy",
    Softmax => "softmax",
});

// ============================================================================
// Batch name map
// ============================================================================

/// Maps the learner's logical field names to the names a batch provider uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchNameMap {
    pub obs: String,
    pub next_obs: String,
    pub rewards: String,
    pub discrete_actions: Option<String>,
    pub continuous_actions: Option<String>,
    pub discrete_log_probs: Option<String>,
    pub continuous_log_probs: Option<String>,
    /// Precomputed per-step values (optional).
    pub values: Option<String>,
    /// Flat per-head legality rows (optional).
    pub action_mask: Option<String>,
}

impl Default for BatchNameMap {
    fn default() -> Self {
        Self {
            obs: "obs".to_string(),
            next_obs: "obs_".to_string(),
            rewards: "global_rewards".to_string(),
            discrete_actions: Some("discrete_actions".to_string()),
            continuous_actions: Some("continuous_actions".to_string()),
            discrete_log_probs: Some("discrete_log_probs".to_string()),
            continuous_log_probs: Some("continuous_log_probs".to_string()),
            values: None,
            action_mask: None,
        }
    }
}

impl BatchNameMap {
    pub fn with_rewards(mut self, name: impl Into<String>) -> Self {
        self.rewards = name.into();
        self
    }

    pub fn with_values(mut self, name: impl Into<String>) -> Self {
        self.values = Some(name.into());
        self
    }

    pub fn with_action_mask(mut self, name: impl Into<String>) -> Self {
        self.action_mask = Some(name.into());
        self
    }

    /// Every action kind the space declares must be addressable.
    ///
    /// `needs_log_probs` is false for learners that never read collection-time
    /// log-probabilities (the value-based agent).
    pub fn validate(&self, space: &ActionSpace, needs_log_probs: bool) -> Result<(), ConfigError> {
        for (logical, name) in [
            ("obs", &self.obs),
            ("obs_", &self.next_obs),
            ("rewards", &self.rewards),
        ] {
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "batch name map must define '{}'",
                    logical
                )));
            }
        }
        if space.has_discrete()
            && (self.discrete_actions.is_none()
                || (needs_log_probs && self.discrete_log_probs.is_none()))
        {
            return Err(ConfigError::Invalid(
                "discrete heads declared but 'discrete_actions' or 'discrete_log_probs' is not mapped"
                    .to_string(),
            ));
        }
        if space.has_continuous()
            && (self.continuous_actions.is_none()
                || (needs_log_probs && self.continuous_log_probs.is_none()))
        {
            return Err(ConfigError::Invalid(
                "continuous dimensions declared but 'continuous_actions' or 'continuous_log_probs' is not mapped"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Policy-gradient config
// ============================================================================

/// Configuration of [`PgAgent`](crate::agents::PgAgent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgConfig {
    pub obs_dim: usize,
    pub action_space: ActionSpace,
    pub hidden_dims: Vec<usize>,
    pub activation: Activation,
    /// Orthogonal weight initialization (uniform fan-in otherwise).
    pub orthogonal: bool,

    pub lr: f64,
    pub gamma: f32,
    pub gae_lambda: f32,
    pub n_epochs: usize,
    pub mini_batch_size: usize,
    /// Clip ratio epsilon; `<= 0` selects vanilla policy gradient.
    pub ppo_clip: f32,
    pub entropy_coef: f32,
    pub value_loss_coef: f32,
    /// Clip range of the value update around the frozen values.
    pub value_clip: Option<f32>,
    pub advantage_type: AdvantageType,
    pub norm_advantages: bool,
    /// Environment steps over which the LR anneals; 0 disables annealing.
    pub anneal_lr: usize,
    pub clip_grad: bool,
    pub max_grad_norm: f32,

    pub std_type: StdType,
    pub action_clamp_type: ActionClampType,
    pub log_std_range: (f32, f32),
    /// MSE imitation instead of maximum likelihood.
    pub naive_imitation: bool,
    pub eval_mode: bool,
    pub name: String,
    pub batch_name_map: BatchNameMap,
}

impl PgConfig {
    /// Defaults for a given observation size and action space.
    pub fn new(obs_dim: usize, action_space: ActionSpace) -> Self {
        Self {
            obs_dim,
            action_space,
            hidden_dims: vec![256, 256],
            activation: Activation::Relu,
            orthogonal: true,
            lr: 2.5e-3,
            gamma: 0.99,
            gae_lambda: 0.95,
            n_epochs: 2,
            mini_batch_size: 64,
            ppo_clip: 0.2,
            entropy_coef: 0.05,
            value_loss_coef: 0.5,
            value_clip: None,
            advantage_type: AdvantageType::Gae,
            norm_advantages: true,
            anneal_lr: 200_000,
            clip_grad: true,
            max_grad_norm: 0.5,
            std_type: StdType::Stateless,
            action_clamp_type: ActionClampType::Tanh,
            log_std_range: (-5.0, 2.0),
            naive_imitation: false,
            eval_mode: false,
            name: "PPO".to_string(),
            batch_name_map: BatchNameMap::default(),
        }
    }

    pub fn with_hidden_dims(mut self, hidden_dims: Vec<usize>) -> Self {
        self.hidden_dims = hidden_dims;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_orthogonal(mut self, orthogonal: bool) -> Self {
        self.orthogonal = orthogonal;
        self
    }

    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_gae_lambda(mut self, gae_lambda: f32) -> Self {
        self.gae_lambda = gae_lambda;
        self
    }

    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    pub fn with_mini_batch_size(mut self, mini_batch_size: usize) -> Self {
        self.mini_batch_size = mini_batch_size;
        self
    }

    pub fn with_ppo_clip(mut self, ppo_clip: f32) -> Self {
        self.ppo_clip = ppo_clip;
        self
    }

    pub fn with_entropy_coef(mut self, entropy_coef: f32) -> Self {
        self.entropy_coef = entropy_coef;
        self
    }

    pub fn with_value_loss_coef(mut self, value_loss_coef: f32) -> Self {
        self.value_loss_coef = value_loss_coef;
        self
    }

    pub fn with_value_clip(mut self, value_clip: Option<f32>) -> Self {
        self.value_clip = value_clip;
        self
    }

    pub fn with_advantage_type(mut self, advantage_type: AdvantageType) -> Self {
        self.advantage_type = advantage_type;
        self
    }

    pub fn with_norm_advantages(mut self, norm_advantages: bool) -> Self {
        self.norm_advantages = norm_advantages;
        self
    }

    pub fn with_anneal_lr(mut self, anneal_lr: usize) -> Self {
        self.anneal_lr = anneal_lr;
        self
    }

    pub fn with_clip_grad(mut self, clip_grad: bool) -> Self {
        self.clip_grad = clip_grad;
        self
    }

    pub fn with_max_grad_norm(mut self, max_grad_norm: f32) -> Self {
        self.max_grad_norm = max_grad_norm;
        self
    }

    pub fn with_std_type(mut self, std_type: StdType) -> Self {
        self.std_type = std_type;
        self
    }

    pub fn with_action_clamp_type(mut self, action_clamp_type: ActionClampType) -> Self {
        self.action_clamp_type = action_clamp_type;
        self
    }

    pub fn with_log_std_range(mut self, low: f32, high: f32) -> Self {
        self.log_std_range = (low, high);
        self
    }

    pub fn with_naive_imitation(mut self, naive_imitation: bool) -> Self {
        self.naive_imitation = naive_imitation;
        self
    }

    pub fn with_eval_mode(mut self, eval_mode: bool) -> Self {
        self.eval_mode = eval_mode;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_batch_name_map(mut self, batch_name_map: BatchNameMap) -> Self {
        self.batch_name_map = batch_name_map;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_count("obs_dim", self.obs_dim)?;
        check_count("n_epochs", self.n_epochs)?;
        check_count("mini_batch_size", self.mini_batch_size)?;
        if self.hidden_dims.is_empty() || self.hidden_dims.contains(&0) {
            return Err(ConfigError::Invalid(format!(
                "hidden_dims must be non-empty and positive, got {:?}",
                self.hidden_dims
            )));
        }
        check_range("gamma", self.gamma, 0.0, 1.0)?;
        check_range("gae_lambda", self.gae_lambda, 0.0, 1.0)?;
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ConfigError::Invalid(format!("lr must be positive, got {}", self.lr)));
        }
        if let Some(clip) = self.value_clip {
            check_range("value_clip", clip, 0.0, f32::MAX)?;
        }
        if self.clip_grad && !(self.max_grad_norm > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_grad_norm must be positive when clip_grad is set, got {}",
                self.max_grad_norm
            )));
        }
        let (low, high) = self.log_std_range;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(ConfigError::Invalid(format!(
                "log_std_range must be an increasing finite pair, got ({}, {})",
                low, high
            )));
        }
        self.batch_name_map.validate(&self.action_space, true)
    }
}

// ============================================================================
// DQN config
// ============================================================================

/// Temporal-difference target family, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqnVariant {
    Greedy,
    Soft,
    Munchausen,
}

impl DqnVariant {
    /// `entropy <= 0` is greedy; a positive Munchausen scale needs entropy too.
    pub fn from_coefficients(entropy: f32, munchausen: f32) -> Self {
        if entropy > 0.0 && munchausen > 0.0 {
            DqnVariant::Munchausen
        } else if entropy > 0.0 {
            DqnVariant::Soft
        } else {
            DqnVariant::Greedy
        }
    }
}

/// Configuration of [`DqnAgent`](crate::agents::DqnAgent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    pub obs_dim: usize,
    pub action_space: ActionSpace,
    pub hidden_dims: Vec<usize>,
    pub activation: Activation,
    pub orthogonal: bool,
    pub gamma: f32,
    pub lr: f64,
    pub dueling: bool,
    /// Bins per continuous dimension.
    pub n_c_action_bins: usize,
    /// Munchausen scale (needs `entropy > 0`).
    pub munchausen: f32,
    /// Entropy temperature; positive values select soft Q-learning.
    pub entropy: f32,
    pub init_eps: f32,
    pub eps_decay_half_life: usize,
    /// Global gradient-norm limit; `None` disables clipping.
    pub clip_grad: Option<f32>,
    pub selection_mode: ActionSelectionMode,
    pub eval_mode: bool,
    pub name: String,
    pub batch_name_map: BatchNameMap,
}

impl DqnConfig {
    pub fn new(obs_dim: usize, action_space: ActionSpace) -> Self {
        Self {
            obs_dim,
            action_space,
            hidden_dims: vec![64, 64],
            activation: Activation::Relu,
            orthogonal: false,
            gamma: 0.99,
            lr: 3e-5,
            dueling: false,
            n_c_action_bins: 10,
            munchausen: 0.0,
            entropy: 0.0,
            init_eps: 0.9,
            eps_decay_half_life: 10_000,
            clip_grad: Some(1.0),
            selection_mode: ActionSelectionMode::EpsilonGreedy,
            eval_mode: false,
            name: "DQN".to_string(),
            batch_name_map: BatchNameMap::default(),
        }
    }

    pub fn with_hidden_dims(mut self, hidden_dims: Vec<usize>) -> Self {
        self.hidden_dims = hidden_dims;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_orthogonal(mut self, orthogonal: bool) -> Self {
        self.orthogonal = orthogonal;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_dueling(mut self, dueling: bool) -> Self {
        self.dueling = dueling;
        self
    }

    pub fn with_n_c_action_bins(mut self, n_c_action_bins: usize) -> Self {
        self.n_c_action_bins = n_c_action_bins;
        self
    }

    pub fn with_munchausen(mut self, munchausen: f32) -> Self {
        self.munchausen = munchausen;
        self
    }

    pub fn with_entropy(mut self, entropy: f32) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn with_init_eps(mut self, init_eps: f32) -> Self {
        self.init_eps = init_eps;
        self
    }

    pub fn with_eps_decay_half_life(mut self, eps_decay_half_life: usize) -> Self {
        self.eps_decay_half_life = eps_decay_half_life;
        self
    }

    pub fn with_clip_grad(mut self, clip_grad: Option<f32>) -> Self {
        self.clip_grad = clip_grad;
        self
    }

    pub fn with_selection_mode(mut self, selection_mode: ActionSelectionMode) -> Self {
        self.selection_mode = selection_mode;
        self
    }

    pub fn with_eval_mode(mut self, eval_mode: bool) -> Self {
        self.eval_mode = eval_mode;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_batch_name_map(mut self, batch_name_map: BatchNameMap) -> Self {
        self.batch_name_map = batch_name_map;
        self
    }

    pub fn variant(&self) -> DqnVariant {
        DqnVariant::from_coefficients(self.entropy, self.munchausen)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_count("obs_dim", self.obs_dim)?;
        if self.hidden_dims.is_empty() || self.hidden_dims.contains(&0) {
            return Err(ConfigError::Invalid(format!(
                "hidden_dims must be non-empty and positive, got {:?}",
                self.hidden_dims
            )));
        }
        if self.n_c_action_bins < 2 {
            return Err(ConfigError::Invalid(format!(
                "n_c_action_bins must be >= 2, got {}",
                self.n_c_action_bins
            )));
        }
        check_range("gamma", self.gamma, 0.0, 1.0)?;
        check_range("init_eps", self.init_eps, 0.0, 1.0)?;
        check_count("eps_decay_half_life", self.eps_decay_half_life)?;
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ConfigError::Invalid(format!("lr must be positive, got {}", self.lr)));
        }
        if let Some(clip) = self.clip_grad {
            if !(clip > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "clip_grad must be positive, got {}",
                    clip
                )));
            }
        }
        self.batch_name_map.validate(&self.action_space, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ActionSpace {
        ActionSpace::new(2, &[0.0, 0.0], &[1.0, 2.0], vec![4, 5]).unwrap()
    }

    #[test]
    fn test_parse_options_case_insensitive() {
        assert_eq!("GAE".parse::<AdvantageType>().unwrap(), AdvantageType::Gae);
        assert_eq!("G".parse::<AdvantageType>().unwrap(), AdvantageType::G);
        assert_eq!("Tanh".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!("full".parse::<StdType>().unwrap(), StdType::Full);
        assert_eq!("clamp".parse::<ActionClampType>().unwrap(), ActionClampType::Clamp);
        assert_eq!(
            "softmax".parse::<ActionSelectionMode>().unwrap(),
            ActionSelectionMode::Softmax
        );
    }

    #[test]
    fn test_invalid_strings_are_config_errors() {
        assert!(matches!(
            "td3".parse::<AdvantageType>(),
            Err(ConfigError::UnknownVariant { kind: "advantage type", .. })
        ));
        assert!(matches!(
            "gelu".parse::<Activation>(),
            Err(ConfigError::UnknownVariant { kind: "activation", .. })
        ));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for adv in [
            AdvantageType::G,
            AdvantageType::Gv,
            AdvantageType::Constant,
            AdvantageType::Gae,
            AdvantageType::A2c,
        ] {
            assert_eq!(adv.to_string().parse::<AdvantageType>().unwrap(), adv);
        }
    }

    #[test]
    fn test_default_pg_config_is_valid() {
        assert!(PgConfig::new(3, space()).validate().is_ok());
    }

    #[test]
    fn test_pg_config_rejects_bad_counts() {
        let config = PgConfig::new(3, space()).with_mini_batch_size(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCount {
                field: "mini_batch_size",
                value: 0
            })
        );
        assert!(PgConfig::new(3, space()).with_gamma(1.5).validate().is_err());
        assert!(PgConfig::new(3, space())
            .with_log_std_range(1.0, -1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_name_map_must_cover_declared_actions() {
        let mut names = BatchNameMap::default();
        names.discrete_log_probs = None;
        let config = PgConfig::new(3, space()).with_batch_name_map(names.clone());
        assert!(config.validate().is_err());

        // The value-based learner does not read log-probabilities.
        let dqn = DqnConfig::new(3, space()).with_batch_name_map(names);
        assert!(dqn.validate().is_ok());
    }

    #[test]
    fn test_dqn_variant_selection() {
        assert_eq!(DqnVariant::from_coefficients(0.0, 0.0), DqnVariant::Greedy);
        assert_eq!(DqnVariant::from_coefficients(0.0, 0.9), DqnVariant::Greedy);
        assert_eq!(DqnVariant::from_coefficients(0.1, 0.0), DqnVariant::Soft);
        assert_eq!(DqnVariant::from_coefficients(0.1, 0.9), DqnVariant::Munchausen);
    }

    #[test]
    fn test_dqn_config_rejects_single_bin() {
        let config = DqnConfig::new(3, space()).with_n_c_action_bins(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = PgConfig::new(3, space())
            .with_advantage_type(AdvantageType::Constant)
            .with_std_type(StdType::Full);
        let json = serde_json::to_string(&config).unwrap();
        let restored: PgConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
