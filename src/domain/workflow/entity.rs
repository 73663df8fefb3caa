//! Workflow domain entity

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::definition::WorkflowDefinition;
use crate::domain::validation::ValidationError;

/// Maximum length for workflow IDs
pub const MAX_ID_LENGTH: usize = 50;

/// Regex pattern for valid workflow IDs: alphanumeric and hyphens
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]$|^[a-zA-Z0-9]$").unwrap());

/// Validated workflow identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new validated workflow ID
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        validate_workflow_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkflowId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkflowId> for String {
    fn from(id: WorkflowId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WorkflowId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a workflow ID string
pub fn validate_workflow_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::InvalidName {
            field: "workflow_id".to_string(),
            reason: "Workflow ID cannot be empty".to_string(),
        });
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(ValidationError::InvalidName {
            field: "workflow_id".to_string(),
            reason: format!(
                "Workflow ID exceeds maximum length of {} characters",
                MAX_ID_LENGTH
            ),
        });
    }

    if !ID_PATTERN.is_match(id) {
        return Err(ValidationError::InvalidName {
            field: "workflow_id".to_string(),
            reason: format!(
                "Invalid workflow ID '{}': must be alphanumeric with hyphens, start and end with alphanumeric",
                id
            ),
        });
    }

    Ok(())
}

/// A versioned workflow.
///
/// The live definition pointer (`definition` + `version`) only changes inside
/// the activation transaction, which is why its setter is crate-private.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    id: WorkflowId,

    name: String,

    /// Owning user or team
    owner: String,

    /// Definition of the active version, absent until first activation
    #[serde(skip_serializing_if = "Option::is_none")]
    definition: Option<WorkflowDefinition>,

    /// Semantic version string of the active version
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(id: WorkflowId, name: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
            definition: None,
            version: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn definition(&self) -> Option<&WorkflowDefinition> {
        self.definition.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Point the workflow at a newly activated definition
    pub(crate) fn set_live_definition(
        &mut self,
        definition: WorkflowDefinition,
        version: impl Into<String>,
    ) {
        self.definition = Some(definition);
        self.version = Some(version.into());
        self.updated_at = Utc::now();
    }

    /// Seed a live definition, for fixtures that start from an already-deployed workflow
    pub fn with_live_definition(
        mut self,
        definition: WorkflowDefinition,
        version: impl Into<String>,
    ) -> Self {
        self.set_live_definition(definition, version);
        self
    }
}
