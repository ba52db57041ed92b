//! # Hybrid RL: learners for mixed discrete + continuous action spaces
//!
//! Policy-gradient (PPO / vanilla PG) and Q-learning (DQN, soft DQN,
//! Munchausen DQN) agents whose actions combine any number of categorical
//! heads with a bounded multi-dimensional continuous part, built on Burn.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Agent<B>                                │
//! │   select_action / evaluate_action_deterministic / expected_value │
//! │   update_from_batch / imitation_update / save / load             │
//! ├──────────────────────────────┬───────────────────────────────────┤
//! │          PgAgent             │            DqnAgent               │
//! │  HybridActor  ValueNetwork   │   QNetwork (dueling optional)     │
//! │  StatelessLogStd (optional)  │   Discretizer (continuous bins)   │
//! │  AdvantageEstimator          │   EpsilonDecay                    │
//! │  PPO / vanilla / imitation   │   greedy / soft / Munchausen TD   │
//! ├──────────────────────────────┴───────────────────────────────────┤
//! │  TrajectoryBatch + BatchNameMap    Checkpointer    Adam + clip   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use hybrid_rl::{ActionSpace, Agent, PgAgent, PgConfig};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let space = ActionSpace::new(2, &[0.0, 0.0], &[1.0, 2.0], vec![4, 5])?;
//! let config = PgConfig::new(3, space).with_mini_batch_size(32);
//! let mut agent = PgAgent::<B>::new(config, &Default::default())?;
//!
//! let action = agent.select_action(&obs, None, true)?;
//! // ... collect a TrajectoryBatch ...
//! let (actor_loss, critic_loss) = agent.update_from_batch(&batch, 0)?;
//! agent.save("checkpoints/ppo")?;
//! ```

pub mod action_space;
pub mod agents;
pub mod algorithms;
pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod nn;
pub mod scheduling;

pub use action_space::ActionSpace;
pub use agents::{ActionSelection, Agent, DqnAgent, PgAgent, PgModel};
pub use batch::{BatchField, FieldView, ResolvedBatch, TrajectoryBatch};
pub use checkpoint::Checkpointer;
pub use config::{
    ActionClampType, ActionSelectionMode, Activation, AdvantageType, BatchNameMap, DqnConfig, DqnVariant,
    PgConfig, StdType,
};
pub use error::{ConfigError, HybridRlError, Result};

// Advantage helpers for batch providers
pub use algorithms::{compute_gae, monte_carlo_returns, normalize_advantages};

// Learning rate and exploration schedules
pub use scheduling::{AnnealedLR, EpsilonDecay, LRScheduler};
