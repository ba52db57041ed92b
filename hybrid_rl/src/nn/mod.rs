//! Network building blocks.
//!
//! # Modules
//!
//! - [`linear`]: linear layer with orthogonal or fan-in uniform initialization
//! - [`encoder`]: feed-forward observation encoder
//! - [`actor`]: hybrid stochastic actor, stateless log-std and state-value critic
//! - [`q_network`]: multi-head (optionally dueling) Q-network

pub mod actor;
pub mod encoder;
pub mod linear;
pub mod q_network;

pub use actor::{ActorOutput, HybridActor, HybridActorConfig, StatelessLogStd, ValueNetwork};
pub use encoder::{FeedForwardEncoder, FeedForwardEncoderConfig};
pub use linear::{InitLinear, InitLinearConfig};
pub use q_network::{QNetwork, QNetworkConfig, QOutput};
