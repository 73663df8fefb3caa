//! Migration error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised while building or running a migration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MigrationError {
    #[error("unknown migration action: {0}")]
    UnknownAction(String),

    #[error("Step {order} ('{action}') failed: {message}")]
    StepFailed {
        order: u32,
        action: String,
        message: String,
    },

    #[error("Step {order} ('{action}') timed out after {timeout_ms}ms")]
    Timeout {
        order: u32,
        action: String,
        timeout_ms: u64,
    },

    #[error("Invalid execution state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),
}

impl MigrationError {
    pub fn step_failed(order: u32, action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StepFailed {
            order,
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

impl MigrationError {
    /// Order of the step the error concerns, if any
    pub fn step(&self) -> Option<u32> {
        match self {
            Self::StepFailed { order, .. } | Self::Timeout { order, .. } => Some(*order),
            _ => None,
        }
    }
}

impl From<MigrationError> for DomainError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::InvalidTransition { .. } => DomainError::internal(err.to_string()),
            MigrationError::Precondition(_) => DomainError::validation(err.to_string()),
            _ => DomainError::migration("", err.step(), err.to_string()),
        }
    }
}
