//! Error type shared by every learner in the crate.

use thiserror::Error;

pub use crate::config::ConfigError;

/// Errors raised by agent construction, learning calls and persistence.
#[derive(Error, Debug)]
pub enum HybridRlError {
    /// Invalid hyperparameters or action space, raised at construction.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The global gradient norm was NaN or infinite; no parameter was updated.
    #[error("Non-finite gradient norm ({norm}), optimizer step aborted")]
    NonFiniteGradient { norm: f64 },

    /// A network produced NaN or infinite outputs.
    #[error("Non-finite network output: {0}")]
    NonFiniteOutput(String),

    /// The batch lacks a field the configured action space needs.
    #[error("Batch is missing field '{field}' (logical name '{logical}')")]
    MissingField { field: String, logical: String },

    /// Array lengths or widths disagree with the declared shapes.
    #[error("Shape error: {0}")]
    Shape(String),

    /// A stored or expert action is outside the action space.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Burn recorder failure while saving or loading parameter blobs.
    #[error("Recorder error: {0}")]
    Recorder(String),
}

impl From<burn::record::RecorderError> for HybridRlError {
    fn from(err: burn::record::RecorderError) -> Self {
        HybridRlError::Recorder(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HybridRlError>;

impl HybridRlError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        HybridRlError::Config(ConfigError::Invalid(msg.into()))
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        HybridRlError::Shape(msg.into())
    }
}
