//! Migration plan model

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::comparison::SchemaSide;
use crate::domain::id::string_id;
use crate::domain::version::VersionId;
use crate::domain::workflow::{FieldType, WorkflowId};

string_id!(
    /// Identifier of a migration plan
    PlanId,
    "plan"
);

string_id!(
    /// Identifier of a migration step
    StepId,
    "step"
);

/// Category of a migration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStepType {
    SchemaUpdate,
    DataMigration,
    ConfigUpdate,
    Validation,
    Cleanup,
    Backup,
    Notification,
    Custom,
}

impl MigrationStepType {
    /// Step types counted towards a plan's risk
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::SchemaUpdate | Self::DataMigration)
    }
}

/// Risk classification of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Risk for a plan with the given number of schema/data steps
    pub fn from_high_risk_steps(count: usize) -> Self {
        if count > 5 {
            Self::Critical
        } else if count > 3 {
            Self::High
        } else if count > 1 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// One level up, saturating at critical
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }

    pub fn requires_safeguards(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Operation performed by a migration step, with its typed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MigrationAction {
    CreateWorkflowSchema { version: String },
    RemoveWorkflowSchema { version: String },
    AddStep { step: String },
    RemoveStep { step: String },
    UpdateStep { step: String },
    RestoreStep { step: String },
    ChangeStepType { step: String, from: String, to: String },
    MoveStep { step: String, from: usize, to: usize },
    AdjustStepCount { from: usize, to: usize },
    AddSchemaField { schema: SchemaSide, field: String, field_type: FieldType },
    RemoveSchemaField { schema: SchemaSide, field: String, field_type: FieldType },
    ConvertFieldType { schema: SchemaSide, field: String, from: FieldType, to: FieldType },
    UpdateFieldRequirement { schema: SchemaSide, field: String, required: bool },
    UpdateConfig { key: String, from: Option<String>, to: Option<String> },
    ValidateDefinition,
    /// Operator-supplied action, dispatched to a registered handler by name
    Custom {
        name: String,
        #[serde(default)]
        parameters: Value,
    },
    /// Synthetic inverse of an action that has no known inverse
    Revert { reverts_action: String },
}

impl MigrationAction {
    /// Identifier used for handler dispatch and reporting
    pub fn identifier(&self) -> String {
        match self {
            Self::CreateWorkflowSchema { .. } => "create_workflow_schema".to_string(),
            Self::RemoveWorkflowSchema { .. } => "remove_workflow_schema".to_string(),
            Self::AddStep { .. } => "add_step".to_string(),
            Self::RemoveStep { .. } => "remove_step".to_string(),
            Self::UpdateStep { .. } => "update_step".to_string(),
            Self::RestoreStep { .. } => "restore_step".to_string(),
            Self::ChangeStepType { .. } => "change_step_type".to_string(),
            Self::MoveStep { .. } => "move_step".to_string(),
            Self::AdjustStepCount { .. } => "adjust_step_count".to_string(),
            Self::AddSchemaField { .. } => "add_schema_field".to_string(),
            Self::RemoveSchemaField { .. } => "remove_schema_field".to_string(),
            Self::ConvertFieldType { .. } => "convert_field_type".to_string(),
            Self::UpdateFieldRequirement { .. } => "update_field_requirement".to_string(),
            Self::UpdateConfig { .. } => "update_config".to_string(),
            Self::ValidateDefinition => "validate_definition".to_string(),
            Self::Custom { name, .. } => name.clone(),
            Self::Revert { reverts_action } => format!("revert_{}", reverts_action),
        }
    }

    pub fn step_type(&self) -> MigrationStepType {
        match self {
            Self::CreateWorkflowSchema { .. }
            | Self::RemoveWorkflowSchema { .. }
            | Self::AddStep { .. }
            | Self::RemoveStep { .. }
            | Self::UpdateStep { .. }
            | Self::RestoreStep { .. }
            | Self::ChangeStepType { .. }
            | Self::MoveStep { .. }
            | Self::AdjustStepCount { .. } => MigrationStepType::SchemaUpdate,
            Self::AddSchemaField { .. }
            | Self::RemoveSchemaField { .. }
            | Self::ConvertFieldType { .. }
            | Self::UpdateFieldRequirement { .. } => MigrationStepType::DataMigration,
            Self::UpdateConfig { .. } => MigrationStepType::ConfigUpdate,
            Self::ValidateDefinition => MigrationStepType::Validation,
            Self::Custom { .. } | Self::Revert { .. } => MigrationStepType::Custom,
        }
    }

    /// Rollback mapping. Custom actions have no known inverse and map to a
    /// synthetic `revert_<name>` action; reversing that yields the custom
    /// action again without its original parameters.
    pub fn inverse(&self) -> Self {
        match self {
            Self::CreateWorkflowSchema { version } => Self::RemoveWorkflowSchema {
                version: version.clone(),
            },
            Self::RemoveWorkflowSchema { version } => Self::CreateWorkflowSchema {
                version: version.clone(),
            },
            Self::AddStep { step } => Self::RemoveStep { step: step.clone() },
            Self::RemoveStep { step } => Self::AddStep { step: step.clone() },
            Self::UpdateStep { step } => Self::RestoreStep { step: step.clone() },
            Self::RestoreStep { step } => Self::UpdateStep { step: step.clone() },
            Self::ChangeStepType { step, from, to } => Self::ChangeStepType {
                step: step.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Self::MoveStep { step, from, to } => Self::MoveStep {
                step: step.clone(),
                from: *to,
                to: *from,
            },
            Self::AdjustStepCount { from, to } => Self::AdjustStepCount {
                from: *to,
                to: *from,
            },
            Self::AddSchemaField {
                schema,
                field,
                field_type,
            } => Self::RemoveSchemaField {
                schema: *schema,
                field: field.clone(),
                field_type: *field_type,
            },
            Self::RemoveSchemaField {
                schema,
                field,
                field_type,
            } => Self::AddSchemaField {
                schema: *schema,
                field: field.clone(),
                field_type: *field_type,
            },
            Self::ConvertFieldType {
                schema,
                field,
                from,
                to,
            } => Self::ConvertFieldType {
                schema: *schema,
                field: field.clone(),
                from: *to,
                to: *from,
            },
            Self::UpdateFieldRequirement {
                schema,
                field,
                required,
            } => Self::UpdateFieldRequirement {
                schema: *schema,
                field: field.clone(),
                required: !required,
            },
            Self::UpdateConfig { key, from, to } => Self::UpdateConfig {
                key: key.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Self::ValidateDefinition => Self::ValidateDefinition,
            Self::Custom { name, .. } => Self::Revert { reverts_action: name.clone() },
            Self::Revert { reverts_action } => Self::Custom {
                name: reverts_action.clone(),
                parameters: Value::Null,
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::CreateWorkflowSchema { version } => {
                format!("Initialize workflow schema at version {}", version)
            }
            Self::RemoveWorkflowSchema { version } => {
                format!("Remove workflow schema of version {}", version)
            }
            Self::AddStep { step } => format!("Add step '{}'", step),
            Self::RemoveStep { step } => format!("Remove step '{}'", step),
            Self::UpdateStep { step } => format!("Update configuration of step '{}'", step),
            Self::RestoreStep { step } => format!("Restore previous configuration of step '{}'", step),
            Self::ChangeStepType { step, from, to } => {
                format!("Change type of step '{}' from {} to {}", step, from, to)
            }
            Self::MoveStep { step, from, to } => {
                format!("Move step '{}' from position {} to {}", step, from, to)
            }
            Self::AdjustStepCount { from, to } => {
                format!("Adjust step count from {} to {}", from, to)
            }
            Self::AddSchemaField { schema, field, field_type } => {
                format!("Add {} field '{}' to {}", field_type, field, schema.as_str())
            }
            Self::RemoveSchemaField { schema, field, .. } => {
                format!("Remove field '{}' from {}", field, schema.as_str())
            }
            Self::ConvertFieldType { schema, field, from, to } => format!(
                "Convert field '{}' in {} from {} to {}",
                field,
                schema.as_str(),
                from,
                to
            ),
            Self::UpdateFieldRequirement { schema, field, required } => format!(
                "Mark field '{}' in {} as {}",
                field,
                schema.as_str(),
                if *required { "required" } else { "optional" }
            ),
            Self::UpdateConfig { key, .. } => format!("Update workflow {}", key),
            Self::ValidateDefinition => "Validate migrated definition".to_string(),
            Self::Custom { name, .. } => format!("Run custom action '{}'", name),
            Self::Revert { reverts_action } => format!("Revert custom action '{}'", reverts_action),
        }
    }
}

/// One ordered step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStep {
    pub id: StepId,

    /// 1-based position within its step list
    pub order: u32,

    pub step_type: MigrationStepType,

    pub description: String,

    #[serde(flatten)]
    pub action: MigrationAction,

    pub timeout_ms: u64,

    pub retry_count: u32,

    /// Order of the forward step this one undoes, on rollback lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverts: Option<u32>,
}

impl MigrationStep {
    pub fn new(order: u32, action: MigrationAction, timeout_ms: u64, retry_count: u32) -> Self {
        Self {
            id: StepId::generate(),
            order,
            step_type: action.step_type(),
            description: action.describe(),
            action,
            timeout_ms,
            retry_count,
            reverts: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Inverse step placed at `order` in a rollback list
    pub fn inverse_at(&self, order: u32) -> Self {
        let mut step = Self::new(order, self.action.inverse(), self.timeout_ms, self.retry_count);
        step.reverts = Some(self.order);
        step
    }
}

/// A check that must hold around a migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub name: String,
    pub description: String,
    /// Blocking rules abort the migration when they fail
    pub blocking: bool,
}

impl ValidationRule {
    pub fn new(name: impl Into<String>, description: impl Into<String>, blocking: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            blocking,
        }
    }
}

/// Direction a plan moves a workflow in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanDirection {
    #[default]
    Forward,
    Rollback,
}

/// Ordered, reversible plan moving a workflow between two versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub id: PlanId,

    pub workflow_id: WorkflowId,

    /// Absent when the plan initializes a workflow's first version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_version_id: Option<VersionId>,

    pub to_version_id: VersionId,

    #[serde(default)]
    pub direction: PlanDirection,

    pub migration_steps: Vec<MigrationStep>,

    pub rollback_steps: Vec<MigrationStep>,

    pub risk_level: RiskLevel,

    /// Sum of step timeouts
    pub estimated_time_ms: u64,

    pub prerequisites: Vec<String>,

    pub validations: Vec<ValidationRule>,

    pub created_at: DateTime<Utc>,
}

impl MigrationPlan {
    pub fn is_initialization(&self) -> bool {
        self.from_version_id.is_none()
    }

}

/// Number of steps whose type counts toward plan risk
pub fn high_risk_step_count(steps: &[MigrationStep]) -> usize {
    steps.iter().filter(|s| s.step_type.is_high_risk()).count()
}
