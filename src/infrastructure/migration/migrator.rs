//! Migrator: plan creation and execution behind one entry point

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::migration::{
    MigrationConfig, MigrationContext, MigrationError, MigrationExecution,
    MigrationExecutionRepository, MigrationPlan, MigrationPlanner, PlanDirection,
};
use crate::domain::validation::Validator;
use crate::domain::version::WorkflowVersion;
use crate::domain::DomainError;

use super::executor::MigrationExecutor;
use super::registry::HandlerRegistry;

#[derive(Debug)]
pub struct Migrator {
    planner: MigrationPlanner,
    executor: MigrationExecutor,
}

impl Migrator {
    pub fn new(
        config: MigrationConfig,
        validator: Validator,
        registry: HandlerRegistry,
        executions: Arc<dyn MigrationExecutionRepository>,
    ) -> Self {
        let executor = MigrationExecutor::new(Arc::new(registry), validator, executions, &config);
        Self {
            planner: MigrationPlanner::new(config),
            executor,
        }
    }

    /// Plan moving from `from` (or nothing) to `to`
    pub fn create_migration_plan(
        &self,
        from: Option<&WorkflowVersion>,
        to: &WorkflowVersion,
    ) -> MigrationPlan {
        self.planner.create_migration_plan(from, to)
    }

    /// Plan returning from `current` to the older `target`
    pub fn create_rollback_plan(
        &self,
        current: &WorkflowVersion,
        target: &WorkflowVersion,
    ) -> MigrationPlan {
        self.planner.create_rollback_plan(current, target)
    }

    #[instrument(skip_all, fields(plan_id = %plan.id, to_version = %to.version()))]
    pub async fn execute_migration(
        &self,
        plan: &MigrationPlan,
        from: Option<&WorkflowVersion>,
        to: &WorkflowVersion,
    ) -> Result<MigrationExecution, DomainError> {
        if plan.direction != PlanDirection::Forward {
            return Err(MigrationError::precondition("execute_migration requires a forward plan").into());
        }
        check_target(plan, to)?;

        let context = MigrationContext::for_plan(
            plan,
            from.map(|v| v.definition().clone()),
            to.definition().clone(),
        );
        info!(steps = plan.migration_steps.len(), risk = %plan.risk_level, "Starting migration");
        self.executor.execute(plan, &context).await
    }

    #[instrument(skip_all, fields(plan_id = %plan.id, to_version = %target.version()))]
    pub async fn execute_rollback(
        &self,
        plan: &MigrationPlan,
        current: &WorkflowVersion,
        target: &WorkflowVersion,
    ) -> Result<MigrationExecution, DomainError> {
        if plan.direction != PlanDirection::Rollback {
            return Err(MigrationError::precondition("execute_rollback requires a rollback plan").into());
        }
        check_target(plan, target)?;

        let context = MigrationContext::for_plan(
            plan,
            Some(current.definition().clone()),
            target.definition().clone(),
        );
        info!(steps = plan.migration_steps.len(), risk = %plan.risk_level, "Starting rollback");
        self.executor.execute(plan, &context).await
    }
}

fn check_target(plan: &MigrationPlan, target: &WorkflowVersion) -> Result<(), DomainError> {
    if &plan.to_version_id != target.id() {
        return Err(MigrationError::precondition(format!(
            "plan targets version {} but {} was given",
            plan.to_version_id,
            target.id()
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::migration::ExecutionStatus;
    use crate::domain::version::{ChangeType, VersionChanges};
    use crate::domain::workflow::{StepDefinition, WorkflowDefinition, WorkflowId};
    use crate::infrastructure::storage::InMemoryStore;

    fn migrator(store: &InMemoryStore) -> Migrator {
        let config = MigrationConfig {
            retry_delay_ms: 0,
            ..Default::default()
        };
        Migrator::new(
            config,
            Validator::default(),
            HandlerRegistry::with_builtins(Validator::default()),
            Arc::new(store.clone()),
        )
    }

    fn version(number: &str, steps: &[&str]) -> WorkflowVersion {
        let definition = steps.iter().fold(WorkflowDefinition::new("orders"), |def, name| {
            def.with_step(StepDefinition::script(*name, "run()"))
        });
        WorkflowVersion::new(
            WorkflowId::new("orders").unwrap(),
            number,
            VersionChanges::new(ChangeType::Minor, definition, "alice"),
        )
    }

    #[tokio::test]
    async fn test_initialization_migration() {
        let store = InMemoryStore::new();
        let migrator = migrator(&store);
        let first = version("1.0.0", &["a"]);

        let plan = migrator.create_migration_plan(None, &first);
        let execution = migrator.execute_migration(&plan, None, &first).await.unwrap();
        assert_eq!(execution.status(), ExecutionStatus::Completed);
        assert_eq!(execution.step_results().len(), 1);
    }

    #[tokio::test]
    async fn test_forward_then_rollback() {
        let store = InMemoryStore::new();
        let migrator = migrator(&store);
        let old = version("1.0.0", &["a"]);
        let new = version("1.1.0", &["a", "b"]);

        let plan = migrator.create_migration_plan(Some(&old), &new);
        let forward = migrator.execute_migration(&plan, Some(&old), &new).await.unwrap();
        assert_eq!(forward.status(), ExecutionStatus::Completed);

        let rollback_plan = migrator.create_rollback_plan(&new, &old);
        let rollback = migrator
            .execute_rollback(&rollback_plan, &new, &old)
            .await
            .unwrap();
        assert_eq!(rollback.status(), ExecutionStatus::RolledBack);
    }

    #[tokio::test]
    async fn test_direction_precondition() {
        let store = InMemoryStore::new();
        let migrator = migrator(&store);
        let old = version("1.0.0", &["a"]);
        let new = version("1.1.0", &["a", "b"]);

        let forward = migrator.create_migration_plan(Some(&old), &new);
        let err = migrator.execute_rollback(&forward, &new, &old).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let rollback = migrator.create_rollback_plan(&new, &old);
        assert!(migrator.execute_migration(&rollback, Some(&new), &old).await.is_err());
    }

    #[tokio::test]
    async fn test_mismatched_target_is_rejected() {
        let store = InMemoryStore::new();
        let migrator = migrator(&store);
        let old = version("1.0.0", &["a"]);
        let new = version("1.1.0", &["a", "b"]);

        let plan = migrator.create_migration_plan(Some(&old), &new);
        assert!(migrator.execute_migration(&plan, Some(&new), &old).await.is_err());
    }
}
