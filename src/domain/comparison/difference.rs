//! Difference and compatibility types

use serde::{Deserialize, Serialize};

use crate::domain::version::VersionId;
use crate::domain::workflow::FieldType;

/// Shape of a single difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceType {
    Added,
    Removed,
    Modified,
    Moved,
}

/// How disruptive a difference is, ordered from least to most
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub fn is_breaking(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// How safely two versions can be swapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityLevel {
    #[default]
    Full,
    Partial,
    None,
}

/// Which schema of a definition a field difference belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSide {
    Input,
    Output,
}

impl SchemaSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input_schema",
            Self::Output => "output_schema",
        }
    }
}

/// Every kind of difference the comparator can detect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DifferenceKind {
    NameChanged { from: String, to: String },
    DescriptionChanged,
    StepCountChanged { from: usize, to: usize },
    StepAdded { step: String },
    StepRemoved { step: String },
    StepModified { step: String },
    StepTypeChanged { step: String, from: String, to: String },
    StepMoved { step: String, from: usize, to: usize },
    FieldAdded { schema: SchemaSide, field: String, field_type: FieldType },
    FieldRemoved { schema: SchemaSide, field: String, field_type: FieldType },
    FieldTypeChanged { schema: SchemaSide, field: String, from: FieldType, to: FieldType },
    FieldRequirementChanged { schema: SchemaSide, field: String, required: bool },
}

impl DifferenceKind {
    pub fn difference_type(&self) -> DifferenceType {
        match self {
            Self::StepAdded { .. } | Self::FieldAdded { .. } => DifferenceType::Added,
            Self::StepRemoved { .. } | Self::FieldRemoved { .. } => DifferenceType::Removed,
            Self::StepMoved { .. } => DifferenceType::Moved,
            Self::NameChanged { .. }
            | Self::DescriptionChanged
            | Self::StepCountChanged { .. }
            | Self::StepModified { .. }
            | Self::StepTypeChanged { .. }
            | Self::FieldTypeChanged { .. }
            | Self::FieldRequirementChanged { .. } => DifferenceType::Modified,
        }
    }

    /// Impact policy table
    pub fn impact(&self) -> ImpactLevel {
        match self {
            Self::NameChanged { .. } | Self::DescriptionChanged => ImpactLevel::Low,
            Self::StepCountChanged { .. } => ImpactLevel::Medium,
            Self::StepAdded { .. } => ImpactLevel::Low,
            Self::StepRemoved { .. } => ImpactLevel::High,
            Self::StepModified { .. } => ImpactLevel::Medium,
            Self::StepTypeChanged { .. } => ImpactLevel::High,
            Self::StepMoved { .. } => ImpactLevel::Medium,
            Self::FieldAdded { .. } => ImpactLevel::Low,
            Self::FieldRemoved { .. } => ImpactLevel::High,
            Self::FieldTypeChanged { .. } => ImpactLevel::Critical,
            Self::FieldRequirementChanged { .. } => ImpactLevel::Medium,
        }
    }

    /// Dotted path of the element the difference concerns
    pub fn path(&self) -> String {
        match self {
            Self::NameChanged { .. } => "name".to_string(),
            Self::DescriptionChanged => "description".to_string(),
            Self::StepCountChanged { .. } => "steps".to_string(),
            Self::StepAdded { step }
            | Self::StepRemoved { step }
            | Self::StepModified { step }
            | Self::StepTypeChanged { step, .. }
            | Self::StepMoved { step, .. } => format!("steps.{}", step),
            Self::FieldAdded { schema, field, .. }
            | Self::FieldRemoved { schema, field, .. }
            | Self::FieldTypeChanged { schema, field, .. }
            | Self::FieldRequirementChanged { schema, field, .. } => {
                format!("{}.{}", schema.as_str(), field)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::NameChanged { from, to } => format!("Workflow renamed from '{}' to '{}'", from, to),
            Self::DescriptionChanged => "Description changed".to_string(),
            Self::StepCountChanged { from, to } => {
                format!("Step count changed from {} to {}", from, to)
            }
            Self::StepAdded { step } => format!("Step '{}' added", step),
            Self::StepRemoved { step } => format!("Step '{}' removed", step),
            Self::StepModified { step } => format!("Step '{}' configuration changed", step),
            Self::StepTypeChanged { step, from, to } => {
                format!("Step '{}' type changed from {} to {}", step, from, to)
            }
            Self::StepMoved { step, from, to } => {
                format!("Step '{}' moved from position {} to {}", step, from, to)
            }
            Self::FieldAdded { schema, field, field_type } => {
                format!("Field '{}' ({}) added to {}", field, field_type, schema.as_str())
            }
            Self::FieldRemoved { schema, field, .. } => {
                format!("Field '{}' removed from {}", field, schema.as_str())
            }
            Self::FieldTypeChanged { schema, field, from, to } => format!(
                "Field '{}' in {} changed type from {} to {}",
                field,
                schema.as_str(),
                from,
                to
            ),
            Self::FieldRequirementChanged { schema, field, required } => format!(
                "Field '{}' in {} is now {}",
                field,
                schema.as_str(),
                if *required { "required" } else { "optional" }
            ),
        }
    }
}

/// A classified difference between two definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDifference {
    pub path: String,
    pub difference_type: DifferenceType,
    pub impact: ImpactLevel,
    pub description: String,
    #[serde(flatten)]
    pub kind: DifferenceKind,
}

impl VersionDifference {
    pub fn new(kind: DifferenceKind) -> Self {
        Self {
            path: kind.path(),
            difference_type: kind.difference_type(),
            impact: kind.impact(),
            description: kind.describe(),
            kind,
        }
    }
}

/// Aggregate view of a list of differences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComparisonSummary {
    pub total: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub moved: usize,
    pub low_impact: usize,
    pub medium_impact: usize,
    pub high_impact: usize,
    pub critical_impact: usize,
    pub has_breaking_changes: bool,
    pub compatibility: CompatibilityLevel,
}

/// Comparison of two stored versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionComparison {
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    pub from_version: String,
    pub to_version: String,
    pub differences: Vec<VersionDifference>,
    pub summary: ComparisonSummary,
}
