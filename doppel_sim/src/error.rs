//! Error types for the scenario harness.

use doppel_core::DoubleError;
use thiserror::Error;

/// Errors that can occur while running scenarios.
#[derive(Debug, Error)]
pub enum SimError {
    /// A double broke one of its guarantees
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// A double raised where the scenario expected a value
    #[error("Unexpected double error: {0}")]
    Double(#[from] DoubleError),

    /// Unknown scenario name or bad configuration
    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Creates an invariant violation.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

/// Fails with an invariant violation unless `cond` holds.
pub fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<(), SimError> {
    if cond {
        Ok(())
    } else {
        Err(SimError::Invariant(msg()))
    }
}
