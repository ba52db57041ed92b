//! Agent persistence.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hybrid_rl::checkpoint::Checkpointer;
//!
//! let ckpt = Checkpointer::create("./checkpoints/ppo")?;
//! ckpt.write_attr("config", &config)?;
//! ckpt.save_module("PI", &actor)?;
//!
//! let ckpt = Checkpointer::open("./checkpoints/ppo")?;
//! let config: PgConfig = ckpt.read_attr("config")?;
//! let actor = ckpt.load_module("PI", template, &device)?;
//! ```

pub mod checkpointer;

pub use checkpointer::Checkpointer;
