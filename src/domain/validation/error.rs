//! Validation error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors produced while validating definitions, version changes and plans
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid change type '{0}': must be one of major, minor, patch")]
    InvalidChangeType(String),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Malformed value at '{field}': {message}")]
    Malformed { field: String, message: String },

    #[error("Invalid name at '{field}': {reason}")]
    InvalidName { field: String, reason: String },

    #[error("Workflow must have at least one step")]
    EmptySteps,

    #[error("Workflow has {count} steps, which exceeds the maximum of {max}")]
    TooManySteps { count: usize, max: usize },

    #[error("Duplicate step name: '{0}'")]
    DuplicateStepName(String),

    #[error("Unsupported step type '{step_type}' at '{field}'")]
    UnknownStepType { field: String, step_type: String },

    #[error("Step '{step}' of type '{step_type}' requires '{field}'")]
    MissingStepField {
        step: String,
        step_type: String,
        field: String,
    },

    #[error("Invalid schema field '{field}': {reason}")]
    InvalidSchemaField { field: String, reason: String },

    #[error("Major changes are not allowed while {count} executions are in flight")]
    InFlightExecutions { count: usize },

    #[error("patch changes must maintain full schema compatibility")]
    PatchIncompatible { field: String },

    #[error("minor changes must be backward compatible: {reason}")]
    MinorIncompatible { field: String, reason: String },

    #[error("Major change declared but no breaking change was detected")]
    NoBreakingChange,

    #[error("Versions belong to different workflows: '{current}' and '{target}'")]
    WorkflowMismatch { current: String, target: String },

    #[error("Cannot roll back from {current} to newer version {target}")]
    RollbackToNewerVersion { current: String, target: String },

    #[error("Version {0} is already the active version")]
    AlreadyActive(String),

    #[error("Version {version} {reason}; return to it with rollback_to_version")]
    RequiresRollback { version: String, reason: String },

    #[error("Invalid semantic version '{0}'")]
    InvalidVersion(String),

    #[error("Invalid migration plan: {reason}")]
    InvalidPlan { field: String, reason: String },
}

impl ValidationError {
    /// Path of the offending field, when one can be named
    pub fn field(&self) -> Option<String> {
        match self {
            Self::InvalidChangeType(_) => Some("change_type".to_string()),
            Self::MissingField(field) => Some(field.clone()),
            Self::Malformed { field, .. }
            | Self::InvalidName { field, .. }
            | Self::UnknownStepType { field, .. }
            | Self::InvalidSchemaField { field, .. }
            | Self::PatchIncompatible { field }
            | Self::MinorIncompatible { field, .. }
            | Self::InvalidPlan { field, .. } => Some(field.clone()),
            Self::EmptySteps | Self::TooManySteps { .. } => Some("steps".to_string()),
            Self::DuplicateStepName(_) => Some("steps".to_string()),
            Self::MissingStepField { field, .. } => Some(field.clone()),
            Self::InvalidVersion(_) => Some("version".to_string()),
            _ => None,
        }
    }

    /// Whether this is a compatibility failure rather than a structural one
    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            Self::InFlightExecutions { .. }
                | Self::PatchIncompatible { .. }
                | Self::MinorIncompatible { .. }
                | Self::NoBreakingChange
        )
    }
}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        if err.is_compatibility() {
            return DomainError::compatibility(err.to_string());
        }

        match err.field() {
            Some(field) => DomainError::validation_field(field, err.to_string()),
            None => DomainError::validation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_message() {
        let err = ValidationError::PatchIncompatible {
            field: "input_schema".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "patch changes must maintain full schema compatibility"
        );
    }

    #[test]
    fn test_compatibility_errors_map_to_compatibility_class() {
        let err: DomainError = ValidationError::InFlightExecutions { count: 2 }.into();
        assert!(matches!(err, DomainError::Compatibility { .. }));
    }

    #[test]
    fn test_structural_errors_keep_field() {
        let err: DomainError = ValidationError::MissingStepField {
            step: "fetch".to_string(),
            step_type: "http".to_string(),
            field: "steps[0].url".to_string(),
        }
        .into();
        assert_eq!(err.field(), Some("steps[0].url"));
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
