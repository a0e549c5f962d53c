//! Drill error types
//!
//! Every failure here is recoverable at the controller boundary: the
//! controller logs it and turns it into a no-op or visual feedback.

use thiserror::Error;

use crate::drill::TargetId;

/// Errors that can occur while running the drill.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrillError {
    /// A target with this id is already registered.
    #[error("target {0} is already registered")]
    DuplicateTarget(TargetId),

    /// No target with this id is registered.
    #[error("unknown target {0}")]
    UnknownTarget(TargetId),

    /// Required-hits text is not a non-negative integer.
    #[error("invalid required hits: {text:?}")]
    InvalidRequirement {
        /// The rejected text.
        text: String,
    },

    /// Settings failed validation or could not be read.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal bookkeeping went wrong. Indicates a logic bug.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DrillError {
    /// Build an [`DrillError::InvariantViolation`], panicking in debug builds.
    pub fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("Invariant violated: {}", msg);
        if cfg!(debug_assertions) {
            panic!("invariant violated: {msg}");
        }
        DrillError::InvariantViolation(msg)
    }
}

/// Result type for drill operations.
pub type DrillResult<T> = Result<T, DrillError>;
