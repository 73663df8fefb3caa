//! Definition, version-change, rollback and plan validation

use std::cmp::Ordering;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::comparison::{compare_definitions, summarize_comparison};
use crate::domain::migration::MigrationPlan;
use crate::domain::version::{compare_versions, ChangeType, VersionChanges, WorkflowVersion};
use crate::domain::workflow::{Schema, StepDefinition, StepKind, WorkflowDefinition};

/// Names may contain letters, digits, spaces, underscores, dots and hyphens,
/// and must start with a letter or digit
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.\-]*$").unwrap());

/// Validator limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub max_steps: usize,
    pub max_name_length: usize,
    /// Reject major changes that contain no breaking difference
    pub strict_mode: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            max_name_length: 100,
            strict_mode: false,
        }
    }
}

/// Workflow state a version change is checked against
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    /// Non-terminal executions of the workflow
    pub in_flight_executions: usize,
    /// Definition the change is measured against, if the workflow has one
    pub previous: Option<&'a WorkflowDefinition>,
}

/// Stateless rule checker. Every check short-circuits on the first failure.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Structural checks on a definition: name, steps, schemas
    pub fn validate_definition(&self, definition: &WorkflowDefinition) -> Result<(), ValidationError> {
        self.check_name("name", &definition.name)?;
        self.check_steps(&definition.steps)?;
        check_schema("input_schema", &definition.input_schema)?;
        check_schema("output_schema", &definition.output_schema)?;
        Ok(())
    }

    /// Full version-change validation. The change type itself is already a
    /// closed enum, so the first rule holds by construction.
    pub fn validate_version(
        &self,
        context: &ValidationContext<'_>,
        changes: &VersionChanges,
    ) -> Result<(), ValidationError> {
        self.validate_definition(&changes.definition)?;

        if changes.change_type == ChangeType::Major && context.in_flight_executions > 0 {
            return Err(ValidationError::InFlightExecutions {
                count: context.in_flight_executions,
            });
        }

        if let Some(previous) = context.previous {
            self.check_compatibility(changes.change_type, previous, &changes.definition)?;
        }

        Ok(())
    }

    /// Forward activation only moves a workflow onto a version that has
    /// never been live and is not older than the active one
    pub fn validate_activation(
        &self,
        current: Option<&WorkflowVersion>,
        target: &WorkflowVersion,
    ) -> Result<(), ValidationError> {
        if target.is_active() {
            return Err(ValidationError::AlreadyActive(target.version().to_string()));
        }

        if target.deactivated_at().is_some() {
            return Err(ValidationError::RequiresRollback {
                version: target.version().to_string(),
                reason: "was deactivated".to_string(),
            });
        }

        if let Some(current) = current {
            if compare_versions(target.version(), current.version())? == Ordering::Less {
                return Err(ValidationError::RequiresRollback {
                    version: target.version().to_string(),
                    reason: format!("is older than the active version {}", current.version()),
                });
            }
        }

        Ok(())
    }

    pub fn validate_rollback(
        &self,
        current: &WorkflowVersion,
        target: &WorkflowVersion,
    ) -> Result<(), ValidationError> {
        if current.workflow_id() != target.workflow_id() {
            return Err(ValidationError::WorkflowMismatch {
                current: current.workflow_id().to_string(),
                target: target.workflow_id().to_string(),
            });
        }

        if current.id() == target.id() || target.is_active() {
            return Err(ValidationError::AlreadyActive(target.version().to_string()));
        }

        if compare_versions(target.version(), current.version())? == Ordering::Greater {
            return Err(ValidationError::RollbackToNewerVersion {
                current: current.version().to_string(),
                target: target.version().to_string(),
            });
        }

        Ok(())
    }

    pub fn validate_migration_plan(&self, plan: &MigrationPlan) -> Result<(), ValidationError> {
        if plan.id.as_str().is_empty() {
            return Err(invalid_plan("id", "plan id is required"));
        }

        if plan.to_version_id.as_str().is_empty() {
            return Err(invalid_plan("to_version_id", "target version id is required"));
        }

        if plan.migration_steps.is_empty() {
            return Err(invalid_plan(
                "migration_steps",
                "plan must contain at least one migration step",
            ));
        }

        for (index, step) in plan.migration_steps.iter().enumerate() {
            let field = format!("migration_steps[{}]", index);

            if step.order as usize != index + 1 {
                return Err(invalid_plan(
                    &field,
                    &format!("step order {} does not match position {}", step.order, index + 1),
                ));
            }

            if step.description.trim().is_empty() {
                return Err(invalid_plan(&field, "step description is required"));
            }

            if step.action.identifier().trim().is_empty() {
                return Err(invalid_plan(&field, "step action is required"));
            }

            if step.timeout_ms == 0 {
                return Err(invalid_plan(&field, "step timeout must be positive"));
            }
        }

        if plan.risk_level.requires_safeguards() {
            if plan.prerequisites.is_empty() {
                return Err(invalid_plan(
                    "prerequisites",
                    &format!("{} risk plans require at least one prerequisite", plan.risk_level),
                ));
            }

            if plan.validations.is_empty() {
                return Err(invalid_plan(
                    "validations",
                    &format!("{} risk plans require at least one validation rule", plan.risk_level),
                ));
            }
        }

        Ok(())
    }

    fn check_name(&self, field: &str, name: &str) -> Result<(), ValidationError> {
        let reason = if name.trim().is_empty() {
            "name cannot be empty".to_string()
        } else if name.chars().count() > self.config.max_name_length {
            format!(
                "name exceeds maximum length of {} characters",
                self.config.max_name_length
            )
        } else if !NAME_PATTERN.is_match(name) {
            format!(
                "'{}' must start with a letter or digit and contain only letters, digits, spaces, '_', '.' or '-'",
                name
            )
        } else {
            return Ok(());
        };

        Err(ValidationError::InvalidName {
            field: field.to_string(),
            reason,
        })
    }

    fn check_steps(&self, steps: &[StepDefinition]) -> Result<(), ValidationError> {
        if steps.is_empty() {
            return Err(ValidationError::EmptySteps);
        }

        if steps.len() > self.config.max_steps {
            return Err(ValidationError::TooManySteps {
                count: steps.len(),
                max: self.config.max_steps,
            });
        }

        let mut seen = HashSet::new();
        for (index, step) in steps.iter().enumerate() {
            self.check_name(&format!("steps[{}].name", index), &step.name)?;

            if !seen.insert(step.name.as_str()) {
                return Err(ValidationError::DuplicateStepName(step.name.clone()));
            }

            check_step_fields(index, step)?;
        }

        Ok(())
    }

    fn check_compatibility(
        &self,
        change_type: ChangeType,
        previous: &WorkflowDefinition,
        next: &WorkflowDefinition,
    ) -> Result<(), ValidationError> {
        match change_type {
            ChangeType::Patch => {
                if previous.input_schema != next.input_schema {
                    return Err(ValidationError::PatchIncompatible {
                        field: "input_schema".to_string(),
                    });
                }
                if previous.output_schema != next.output_schema {
                    return Err(ValidationError::PatchIncompatible {
                        field: "output_schema".to_string(),
                    });
                }
            }
            ChangeType::Minor => {
                check_additive("input_schema", &previous.input_schema, &next.input_schema)?;
                check_additive("output_schema", &previous.output_schema, &next.output_schema)?;
            }
            ChangeType::Major => {
                if self.config.strict_mode {
                    let summary = summarize_comparison(&compare_definitions(previous, next));
                    if !summary.has_breaking_changes {
                        return Err(ValidationError::NoBreakingChange);
                    }
                }
            }
        }

        Ok(())
    }
}

fn invalid_plan(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidPlan {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn check_step_fields(index: usize, step: &StepDefinition) -> Result<(), ValidationError> {
    let missing = |field: &str| ValidationError::MissingStepField {
        step: step.name.clone(),
        step_type: step.kind.type_name().to_string(),
        field: format!("steps[{}].{}", index, field),
    };

    match &step.kind {
        StepKind::Http(http) => {
            if http.url.trim().is_empty() {
                return Err(missing("url"));
            }
            if http.method.trim().is_empty() {
                return Err(missing("method"));
            }
        }
        StepKind::Script(script) if script.source.trim().is_empty() => {
            return Err(missing("source"));
        }
        StepKind::Condition(condition) if condition.expression.trim().is_empty() => {
            return Err(missing("expression"));
        }
        StepKind::Loop(lp) if lp.items.trim().is_empty() => {
            return Err(missing("items"));
        }
        StepKind::Parallel(parallel) if parallel.branches.is_empty() => {
            return Err(missing("branches"));
        }
        _ => {}
    }

    Ok(())
}

fn check_schema(side: &str, schema: &Schema) -> Result<(), ValidationError> {
    for name in schema.keys() {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidSchemaField {
                field: side.to_string(),
                reason: "field name cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Every old field must survive with its declared type
fn check_additive(side: &str, old: &Schema, new: &Schema) -> Result<(), ValidationError> {
    for (name, field) in old {
        let path = format!("{}.{}", side, name);

        match new.get(name) {
            None => {
                return Err(ValidationError::MinorIncompatible {
                    field: path,
                    reason: format!("field '{}' was removed from {}", name, side),
                });
            }
            Some(next) if next.field_type != field.field_type => {
                return Err(ValidationError::MinorIncompatible {
                    field: path,
                    reason: format!(
                        "field '{}' in {} changed type from {} to {}",
                        name, side, field.field_type, next.field_type
                    ),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
