//! Workflow version entities

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::id::string_id;
use crate::domain::migration::MigrationPlan;
use crate::domain::validation::ValidationError;
use crate::domain::workflow::{WorkflowDefinition, WorkflowId};

string_id!(
    /// Identifier of a workflow version
    VersionId,
    "ver"
);

/// Semantic-version bump requested by a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Major,
    Minor,
    Patch,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(ValidationError::InvalidChangeType(s.to_string())),
        }
    }
}

/// A proposed change producing a new version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionChanges {
    pub change_type: ChangeType,

    pub definition: WorkflowDefinition,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_by: String,
}

impl VersionChanges {
    pub fn new(
        change_type: ChangeType,
        definition: WorkflowDefinition,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            change_type,
            definition,
            description: None,
            created_by: created_by.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Immutable snapshot of a workflow definition with lifecycle flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowVersion {
    id: VersionId,

    workflow_id: WorkflowId,

    /// Semantic version string
    version: String,

    change_type: ChangeType,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    definition: WorkflowDefinition,

    is_active: bool,

    /// Plan that migrates the predecessor version into this one
    #[serde(skip_serializing_if = "Option::is_none")]
    migration_plan: Option<MigrationPlan>,

    created_by: String,

    created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    activated_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    deactivated_at: Option<DateTime<Utc>>,

    /// Set by retention; carries no lifecycle meaning
    #[serde(skip_serializing_if = "Option::is_none")]
    archived_at: Option<DateTime<Utc>>,
}

impl WorkflowVersion {
    /// Create a new, inactive version
    pub fn new(
        workflow_id: WorkflowId,
        version: impl Into<String>,
        changes: VersionChanges,
    ) -> Self {
        Self {
            id: VersionId::generate(),
            workflow_id,
            version: version.into(),
            change_type: changes.change_type,
            description: changes.description,
            definition: changes.definition,
            is_active: false,
            migration_plan: None,
            created_by: changes.created_by,
            created_at: Utc::now(),
            activated_at: None,
            deactivated_at: None,
            archived_at: None,
        }
    }

    pub fn with_migration_plan(mut self, plan: MigrationPlan) -> Self {
        self.migration_plan = Some(plan);
        self
    }

    pub fn id(&self) -> &VersionId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn migration_plan(&self) -> Option<&MigrationPlan> {
        self.migration_plan.as_ref()
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn deactivated_at(&self) -> Option<DateTime<Utc>> {
        self.deactivated_at
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub(crate) fn activate(&mut self, at: DateTime<Utc>) {
        self.is_active = true;
        self.activated_at = Some(at);
    }

    pub(crate) fn deactivate(&mut self, at: DateTime<Utc>) {
        self.is_active = false;
        self.deactivated_at = Some(at);
    }

    pub(crate) fn archive(&mut self, at: DateTime<Utc>) {
        self.archived_at = Some(at);
    }
}
