use thiserror::Error;

/// Field carried by validation errors for plans the executor refused to run
pub const REJECTED_PLAN_FIELD: &str = "migration_plan";

/// Core domain errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("Compatibility error: {message}")]
    Compatibility { message: String },

    #[error("Migration failed (execution {execution_id}): {message}")]
    Migration {
        execution_id: String,
        step: Option<u32>,
        message: String,
    },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn compatibility(message: impl Into<String>) -> Self {
        Self::Compatibility {
            message: message.into(),
        }
    }

    pub fn migration(
        execution_id: impl Into<String>,
        step: Option<u32>,
        message: impl Into<String>,
    ) -> Self {
        Self::Migration {
            execution_id: execution_id.into(),
            step,
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a caller may retry the same request unchanged
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Transaction { .. } | Self::Conflict { .. }
        )
    }

    /// Whether the error is caused by the request rather than the system (4xx class)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Validation { .. }
                | Self::Compatibility { .. }
                | Self::Conflict { .. }
        )
    }

    /// Validation error for a migration plan that was cancelled before any step ran
    pub fn rejected_plan(message: impl Into<String>) -> Self {
        Self::validation_field(REJECTED_PLAN_FIELD, message)
    }

    pub fn is_rejected_plan(&self) -> bool {
        self.field() == Some(REJECTED_PLAN_FIELD)
    }

    /// Offending field, when the error carries one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
