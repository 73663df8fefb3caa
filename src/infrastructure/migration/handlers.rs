//! Built-in handlers for structured migration actions
//!
//! Definitions are documents, so applying a structured action amounts to
//! confirming that the definition being migrated to reflects it. A mismatch
//! means the plan is stale and fails the step.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::comparison::SchemaSide;
use crate::domain::migration::{
    ActionHandler, MigrationAction, MigrationContext, MigrationError, MigrationStep,
};
use crate::domain::validation::Validator;
use crate::domain::workflow::{Schema, WorkflowDefinition};

/// Identifiers handled by [`DefinitionActionHandler`]
pub const BUILTIN_ACTIONS: [&str; 15] = [
    "create_workflow_schema",
    "remove_workflow_schema",
    "add_step",
    "remove_step",
    "update_step",
    "restore_step",
    "change_step_type",
    "move_step",
    "adjust_step_count",
    "add_schema_field",
    "remove_schema_field",
    "convert_field_type",
    "update_field_requirement",
    "update_config",
    "validate_definition",
];

/// Applies structured actions against the target definition
#[derive(Debug, Clone, Default)]
pub struct DefinitionActionHandler {
    validator: Validator,
}

impl DefinitionActionHandler {
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }
}

fn schema<'a>(definition: &'a WorkflowDefinition, side: SchemaSide) -> &'a Schema {
    match side {
        SchemaSide::Input => &definition.input_schema,
        SchemaSide::Output => &definition.output_schema,
    }
}

#[async_trait]
impl ActionHandler for DefinitionActionHandler {
    async fn execute(
        &self,
        context: &MigrationContext,
        step: &MigrationStep,
    ) -> Result<Value, MigrationError> {
        let target = &context.target;
        let fail = |message: String| MigrationError::step_failed(step.order, step.action.identifier(), message);

        match &step.action {
            MigrationAction::CreateWorkflowSchema { version } => Ok(json!({
                "version": version,
                "steps": target.step_count(),
                "input_fields": target.input_schema.len(),
                "output_fields": target.output_schema.len(),
            })),
            MigrationAction::RemoveWorkflowSchema { version } => Ok(json!({ "removed": version })),
            MigrationAction::AddStep { step: name }
            | MigrationAction::UpdateStep { step: name }
            | MigrationAction::RestoreStep { step: name } => match target.step(name) {
                Some(found) => Ok(json!({ "step": name, "type": found.kind.type_name() })),
                None => Err(fail(format!("step '{}' is not present in the target definition", name))),
            },
            MigrationAction::RemoveStep { step: name } => {
                if target.step(name).is_some() {
                    return Err(fail(format!("step '{}' is still present in the target definition", name)));
                }
                Ok(json!({ "removed": name }))
            }
            MigrationAction::ChangeStepType { step: name, to, .. } => match target.step(name) {
                Some(found) if found.kind.type_name() == to.as_str() => Ok(json!({ "step": name, "type": to })),
                Some(found) => Err(fail(format!(
                    "step '{}' has type {} but {} was expected",
                    name,
                    found.kind.type_name(),
                    to
                ))),
                None => Err(fail(format!("step '{}' is not present in the target definition", name))),
            },
            MigrationAction::MoveStep { step: name, to, .. } => match target.step_index(name) {
                Some(index) => Ok(json!({ "step": name, "position": to, "index": index })),
                None => Err(fail(format!("step '{}' is not present in the target definition", name))),
            },
            MigrationAction::AdjustStepCount { to, .. } => {
                if target.step_count() != *to {
                    return Err(fail(format!(
                        "target definition has {} steps, expected {}",
                        target.step_count(),
                        to
                    )));
                }
                Ok(json!({ "steps": to }))
            }
            MigrationAction::AddSchemaField {
                schema: side,
                field,
                field_type,
            } => match schema(target, *side).get(field) {
                Some(found) if found.field_type == *field_type => {
                    Ok(json!({ "schema": side.as_str(), "field": field, "type": field_type }))
                }
                _ => Err(fail(format!(
                    "{} field '{}' of type {} is missing from the target definition",
                    side.as_str(),
                    field,
                    field_type
                ))),
            },
            MigrationAction::RemoveSchemaField { schema: side, field, .. } => {
                if schema(target, *side).contains_key(field) {
                    return Err(fail(format!(
                        "{} field '{}' is still present in the target definition",
                        side.as_str(),
                        field
                    )));
                }
                Ok(json!({ "schema": side.as_str(), "removed": field }))
            }
            MigrationAction::ConvertFieldType {
                schema: side,
                field,
                to,
                ..
            } => match schema(target, *side).get(field) {
                Some(found) if found.field_type == *to => {
                    Ok(json!({ "schema": side.as_str(), "field": field, "type": to }))
                }
                _ => Err(fail(format!(
                    "{} field '{}' is not of type {} in the target definition",
                    side.as_str(),
                    field,
                    to
                ))),
            },
            MigrationAction::UpdateFieldRequirement {
                schema: side,
                field,
                required,
            } => match schema(target, *side).get(field) {
                Some(found) if found.required == *required => {
                    Ok(json!({ "schema": side.as_str(), "field": field, "required": required }))
                }
                _ => Err(fail(format!(
                    "{} field '{}' does not have required = {} in the target definition",
                    side.as_str(),
                    field,
                    required
                ))),
            },
            MigrationAction::UpdateConfig { key, to, .. } => {
                let actual = match key.as_str() {
                    "name" => Some(target.name.clone()),
                    "description" => target.description.clone(),
                    _ => return Ok(json!({ "key": key, "value": to })),
                };
                if &actual != to {
                    return Err(fail(format!("workflow {} does not match the planned value", key)));
                }
                Ok(json!({ "key": key, "value": to }))
            }
            MigrationAction::ValidateDefinition => {
                self.validator
                    .validate_definition(target)
                    .map_err(|e| fail(e.to_string()))?;
                Ok(json!({ "valid": true, "steps": target.step_count() }))
            }
            MigrationAction::Custom { .. } | MigrationAction::Revert { .. } => {
                Err(MigrationError::UnknownAction(step.action.identifier()))
            }
        }
    }
}
