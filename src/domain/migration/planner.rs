//! Migration plan builder

use chrono::Utc;
use serde::Deserialize;

use super::plan::{
    high_risk_step_count, MigrationAction, MigrationPlan, MigrationStep, MigrationStepType, PlanDirection, PlanId,
    RiskLevel, ValidationRule,
};
use crate::domain::comparison::{compare_definitions, DifferenceKind};
use crate::domain::version::WorkflowVersion;
use crate::domain::workflow::WorkflowDefinition;

pub const PREREQ_PAUSE_EXECUTIONS: &str = "pause_executions";
pub const PREREQ_VALIDATE_PERMISSIONS: &str = "validate_permissions";
pub const PREREQ_CREATE_BACKUP: &str = "create_backup";
pub const PREREQ_BACKUP_VERIFICATION: &str = "backup_verification";
pub const PREREQ_EXECUTION_PAUSE: &str = "execution_pause";

/// Timeouts and retry policy for generated plans
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub default_step_timeout_ms: u64,
    pub validation_timeout_ms: u64,
    pub initialization_timeout_ms: u64,
    pub default_retry_count: u32,
    /// Pause between attempts of a failed step
    pub retry_delay_ms: u64,
    pub backup_before_migrate: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            default_step_timeout_ms: 30_000,
            validation_timeout_ms: 60_000,
            initialization_timeout_ms: 60_000,
            default_retry_count: 3,
            retry_delay_ms: 100,
            backup_before_migrate: true,
        }
    }
}

/// Builds forward and rollback plans from version pairs
#[derive(Debug, Clone, Default)]
pub struct MigrationPlanner {
    config: MigrationConfig,
}

impl MigrationPlanner {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Plan moving a workflow to `to`. Without a source version the plan
    /// holds a single initialization step.
    pub fn create_migration_plan(
        &self,
        from: Option<&WorkflowVersion>,
        to: &WorkflowVersion,
    ) -> MigrationPlan {
        let migration_steps = match from {
            None => vec![MigrationStep::new(
                1,
                MigrationAction::CreateWorkflowSchema {
                    version: to.version().to_string(),
                },
                self.config.initialization_timeout_ms,
                self.config.default_retry_count,
            )],
            Some(from) => self.diff_steps(from.definition(), to.definition()),
        };

        let rollback_steps = reverse_steps(&migration_steps);
        let risk_level = RiskLevel::from_high_risk_steps(high_risk_step_count(&migration_steps));

        let mut prerequisites = vec![
            PREREQ_PAUSE_EXECUTIONS.to_string(),
            PREREQ_VALIDATE_PERMISSIONS.to_string(),
        ];
        if self.config.backup_before_migrate {
            prerequisites.push(PREREQ_CREATE_BACKUP.to_string());
        }

        let validations = validation_rules(&migration_steps, risk_level);

        MigrationPlan {
            id: PlanId::generate(),
            workflow_id: to.workflow_id().clone(),
            from_version_id: from.map(|v| v.id().clone()),
            to_version_id: to.id().clone(),
            direction: PlanDirection::Forward,
            estimated_time_ms: estimate(&migration_steps),
            migration_steps,
            rollback_steps,
            risk_level,
            prerequisites,
            validations,
            created_at: Utc::now(),
        }
    }

    /// Plan returning the workflow from `current` to the older `target`:
    /// the forward plan `target -> current` with its step lists swapped.
    pub fn create_rollback_plan(
        &self,
        current: &WorkflowVersion,
        target: &WorkflowVersion,
    ) -> MigrationPlan {
        let forward = self.create_migration_plan(Some(target), current);

        let migration_steps = forward.rollback_steps;
        let mut rollback_steps = forward.migration_steps;
        let n = rollback_steps.len() as u32;
        for (j, step) in rollback_steps.iter_mut().enumerate() {
            step.reverts = Some(n - j as u32);
        }

        MigrationPlan {
            id: PlanId::generate(),
            workflow_id: current.workflow_id().clone(),
            from_version_id: Some(current.id().clone()),
            to_version_id: target.id().clone(),
            direction: PlanDirection::Rollback,
            estimated_time_ms: estimate(&migration_steps),
            migration_steps,
            rollback_steps,
            risk_level: forward.risk_level.escalate(),
            prerequisites: vec![
                PREREQ_BACKUP_VERIFICATION.to_string(),
                PREREQ_EXECUTION_PAUSE.to_string(),
            ],
            validations: forward.validations,
            created_at: Utc::now(),
        }
    }

    fn diff_steps(&self, from: &WorkflowDefinition, to: &WorkflowDefinition) -> Vec<MigrationStep> {
        let mut actions: Vec<MigrationAction> = compare_definitions(from, to)
            .into_iter()
            .map(|diff| action_for(diff.kind, from, to))
            .collect();
        actions.push(MigrationAction::ValidateDefinition);

        actions
            .into_iter()
            .enumerate()
            .map(|(i, action)| {
                let timeout = match action.step_type() {
                    MigrationStepType::Validation => self.config.validation_timeout_ms,
                    _ => self.config.default_step_timeout_ms,
                };
                MigrationStep::new(i as u32 + 1, action, timeout, self.config.default_retry_count)
            })
            .collect()
    }
}

fn action_for(
    kind: DifferenceKind,
    source: &WorkflowDefinition,
    target: &WorkflowDefinition,
) -> MigrationAction {
    match kind {
        DifferenceKind::NameChanged { from, to } => MigrationAction::UpdateConfig {
            key: "name".to_string(),
            from: Some(from),
            to: Some(to),
        },
        DifferenceKind::DescriptionChanged => MigrationAction::UpdateConfig {
            key: "description".to_string(),
            from: source.description.clone(),
            to: target.description.clone(),
        },
        DifferenceKind::StepCountChanged { from, to } => MigrationAction::AdjustStepCount { from, to },
        DifferenceKind::StepAdded { step } => MigrationAction::AddStep { step },
        DifferenceKind::StepRemoved { step } => MigrationAction::RemoveStep { step },
        DifferenceKind::StepModified { step } => MigrationAction::UpdateStep { step },
        DifferenceKind::StepTypeChanged { step, from, to } => {
            MigrationAction::ChangeStepType { step, from, to }
        }
        DifferenceKind::StepMoved { step, from, to } => MigrationAction::MoveStep { step, from, to },
        DifferenceKind::FieldAdded {
            schema,
            field,
            field_type,
        } => MigrationAction::AddSchemaField {
            schema,
            field,
            field_type,
        },
        DifferenceKind::FieldRemoved {
            schema,
            field,
            field_type,
        } => MigrationAction::RemoveSchemaField {
            schema,
            field,
            field_type,
        },
        DifferenceKind::FieldTypeChanged {
            schema,
            field,
            from,
            to,
        } => MigrationAction::ConvertFieldType {
            schema,
            field,
            from,
            to,
        },
        DifferenceKind::FieldRequirementChanged {
            schema,
            field,
            required,
        } => MigrationAction::UpdateFieldRequirement {
            schema,
            field,
            required,
        },
    }
}

/// Inverse steps in reverse order, renumbered from 1
fn reverse_steps(steps: &[MigrationStep]) -> Vec<MigrationStep> {
    steps
        .iter()
        .rev()
        .enumerate()
        .map(|(j, step)| step.inverse_at(j as u32 + 1))
        .collect()
}

fn estimate(steps: &[MigrationStep]) -> u64 {
    steps.iter().map(|s| s.timeout_ms).sum()
}

fn validation_rules(steps: &[MigrationStep], risk: RiskLevel) -> Vec<ValidationRule> {
    let mut rules = vec![ValidationRule::new(
        "definition_valid",
        "Target definition passes structural validation",
        true,
    )];

    if steps
        .iter()
        .any(|s| s.step_type == MigrationStepType::DataMigration)
    {
        rules.push(ValidationRule::new(
            "schema_compatible",
            "Existing data conforms to the migrated schemas",
            true,
        ));
    }

    if risk.requires_safeguards() {
        rules.push(ValidationRule::new(
            "no_in_flight_executions",
            "No executions are running against the workflow",
            true,
        ));
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::version::{ChangeType, VersionChanges};
    use crate::domain::workflow::{FieldType, SchemaField, StepDefinition, WorkflowId};

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new("orders")
            .with_step(StepDefinition::http("fetch", "GET", "https://api/orders"))
            .with_step(StepDefinition::script("transform", "map(order)"))
            .with_step(StepDefinition::condition("check", "ok"))
            .with_input_field("order_id", SchemaField::new(FieldType::String).required())
    }

    fn version(number: &str, definition: WorkflowDefinition) -> WorkflowVersion {
        WorkflowVersion::new(
            WorkflowId::new("orders").unwrap(),
            number,
            VersionChanges::new(ChangeType::Minor, definition, "alice"),
        )
    }

    fn changed() -> WorkflowDefinition {
        let mut def = definition()
            .with_step(StepDefinition::script("notify", "send()"))
            .with_output_field("total", SchemaField::new(FieldType::Number));
        def.input_schema.remove("order_id");
        def
    }

    fn assert_reversible(plan: &MigrationPlan) {
        let n = plan.migration_steps.len();
        assert_eq!(plan.rollback_steps.len(), n);
        for (i, step) in plan.migration_steps.iter().enumerate() {
            assert_eq!(step.order as usize, i + 1);
        }
        for (j, step) in plan.rollback_steps.iter().enumerate() {
            assert_eq!(step.order as usize, j + 1);
            assert_eq!(step.reverts, Some((n - j) as u32));
        }
    }

    #[test]
    fn test_initialization_plan_has_single_step() {
        let planner = MigrationPlanner::default();
        let to = version("1.0.0", definition());
        let plan = planner.create_migration_plan(None, &to);

        assert!(plan.is_initialization());
        assert_eq!(plan.migration_steps.len(), 1);
        assert_eq!(plan.migration_steps[0].action.identifier(), "create_workflow_schema");
        assert_eq!(plan.rollback_steps[0].action.identifier(), "remove_workflow_schema");
        assert_eq!(plan.migration_steps[0].timeout_ms, 60_000);
        assert_eq!(plan.risk_level, RiskLevel::Low);
        assert_reversible(&plan);
    }

    #[test]
    fn test_plan_maps_each_difference_to_one_step() {
        let planner = MigrationPlanner::default();
        let from = version("1.0.0", definition());
        let to = version("1.1.0", changed());
        let plan = planner.create_migration_plan(Some(&from), &to);

        let actions: Vec<String> = plan
            .migration_steps
            .iter()
            .map(|s| s.action.identifier())
            .collect();
        assert_eq!(
            actions,
            vec![
                "adjust_step_count",
                "add_step",
                "remove_schema_field",
                "add_schema_field",
                "validate_definition"
            ]
        );
        assert_eq!(plan.migration_steps[1].step_type, MigrationStepType::SchemaUpdate);
        assert_eq!(plan.migration_steps[2].step_type, MigrationStepType::DataMigration);
        assert_eq!(plan.migration_steps[4].step_type, MigrationStepType::Validation);

        // four schema/data steps
        assert_eq!(plan.risk_level, RiskLevel::High);
        assert_eq!(plan.estimated_time_ms, 4 * 30_000 + 60_000);
        assert_eq!(
            plan.prerequisites,
            vec!["pause_executions", "validate_permissions", "create_backup"]
        );
        let names: Vec<&str> = plan.validations.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["definition_valid", "schema_compatible", "no_in_flight_executions"]
        );
        assert_reversible(&plan);
    }

    #[test]
    fn test_backup_prerequisite_is_configurable() {
        let planner = MigrationPlanner::new(MigrationConfig {
            backup_before_migrate: false,
            ..Default::default()
        });
        let plan = planner.create_migration_plan(None, &version("1.0.0", definition()));
        assert!(!plan.prerequisites.iter().any(|p| p == PREREQ_CREATE_BACKUP));
    }

    #[test]
    fn test_identical_definitions_plan_only_validates() {
        let planner = MigrationPlanner::default();
        let from = version("1.0.0", definition());
        let to = version("1.0.1", definition());
        let plan = planner.create_migration_plan(Some(&from), &to);

        assert_eq!(plan.migration_steps.len(), 1);
        assert_eq!(plan.migration_steps[0].action, MigrationAction::ValidateDefinition);
        assert_eq!(plan.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_rollback_plan_swaps_lists_and_escalates_risk() {
        let planner = MigrationPlanner::default();
        let old = version("1.0.0", definition());
        let new = version("1.1.0", changed());

        let forward = planner.create_migration_plan(Some(&old), &new);
        let rollback = planner.create_rollback_plan(&new, &old);

        assert_eq!(rollback.direction, PlanDirection::Rollback);
        assert_eq!(rollback.from_version_id.as_ref(), Some(new.id()));
        assert_eq!(&rollback.to_version_id, old.id());
        assert_eq!(rollback.risk_level, forward.risk_level.escalate());
        assert_eq!(
            rollback.prerequisites,
            vec!["backup_verification", "execution_pause"]
        );
        assert_reversible(&rollback);

        let undo: Vec<MigrationAction> =
            rollback.migration_steps.iter().map(|s| s.action.clone()).collect();
        assert!(undo.contains(&MigrationAction::RemoveStep {
            step: "notify".into()
        }));
    }

    #[test]
    fn test_rename_becomes_config_update() {
        let planner = MigrationPlanner::default();
        let from = version("1.0.0", definition());
        let mut renamed = definition();
        renamed.name = "orders-v2".into();
        let plan = planner.create_migration_plan(Some(&from), &version("1.0.1", renamed));

        assert_eq!(plan.migration_steps[0].step_type, MigrationStepType::ConfigUpdate);
        assert_eq!(
            plan.migration_steps[0].action,
            MigrationAction::UpdateConfig {
                key: "name".into(),
                from: Some("orders".into()),
                to: Some("orders-v2".into())
            }
        );
    }
}
