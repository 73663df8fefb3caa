//! Version manager - creation, activation, rollback and comparison of workflow versions
//!
//! Activation is the only place where a workflow's live definition changes.
//! The forward migration runs first; only when it succeeds are the old
//! version deactivated, the new one activated and the workflow repointed,
//! all inside one transaction.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::domain::comparison::{
    compare_definitions, summarize_comparison, CompatibilityMatrix, VersionComparison,
};
use crate::domain::migration::{
    ExecutionId, MigrationExecution, MigrationPlan, PlanDirection, RollbackId, RollbackRecord,
    RollbackRepository, RollbackStatus,
};
use crate::domain::storage::{Transaction, UnitOfWork};
use crate::domain::validation::{ValidationContext, ValidationError, Validator};
use crate::domain::version::{
    next_version, VersionChanges, VersionId, VersionRepository, WorkflowVersion,
};
use crate::domain::workflow::{ExecutionTracker, Workflow, WorkflowId, WorkflowRepository};
use crate::domain::DomainError;
use crate::infrastructure::migration::Migrator;
use crate::infrastructure::observability::{
    record_rollback, record_version_activated, record_version_created,
};
use crate::infrastructure::storage::InMemoryStore;

/// Result of a successful activation
#[derive(Debug, Clone)]
pub struct Activation {
    /// The newly active version
    pub version: WorkflowVersion,
    /// The version that was active before, now deactivated
    pub previous: Option<WorkflowVersion>,
    /// Forward migration run, absent on first activation
    pub execution: Option<MigrationExecution>,
}

/// Persistence collaborators of the manager
#[derive(Clone)]
pub struct VersionStores {
    pub workflows: Arc<dyn WorkflowRepository>,
    pub versions: Arc<dyn VersionRepository>,
    pub rollbacks: Arc<dyn RollbackRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub tracker: Arc<dyn ExecutionTracker>,
}

impl VersionStores {
    /// Every port backed by one in-memory store
    pub fn in_memory(store: &InMemoryStore, tracker: Arc<dyn ExecutionTracker>) -> Self {
        Self {
            workflows: Arc::new(store.clone()),
            versions: Arc::new(store.clone()),
            rollbacks: Arc::new(store.clone()),
            unit_of_work: Arc::new(store.clone()),
            tracker,
        }
    }
}

pub struct VersionManager {
    stores: VersionStores,
    validator: Validator,
    migrator: Migrator,
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager")
            .field("validator", &self.validator)
            .field("migrator", &self.migrator)
            .finish()
    }
}

impl VersionManager {
    pub fn new(stores: VersionStores, validator: Validator, migrator: Migrator) -> Self {
        Self {
            stores,
            validator,
            migrator,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn versions(&self) -> &Arc<dyn VersionRepository> {
        &self.stores.versions
    }

    pub fn rollbacks(&self) -> &Arc<dyn RollbackRepository> {
        &self.stores.rollbacks
    }

    pub fn unit_of_work(&self) -> &Arc<dyn UnitOfWork> {
        &self.stores.unit_of_work
    }

    /// Validate and persist a new inactive version together with the plan
    /// migrating the latest version into it.
    #[instrument(skip(self, changes), fields(change_type = %changes.change_type))]
    pub async fn create_version(
        &self,
        workflow_id: &WorkflowId,
        changes: VersionChanges,
    ) -> Result<WorkflowVersion, DomainError> {
        let latest = self.check_changes(workflow_id, &changes).await?;

        let number = next_version(latest.as_ref().map(|v| v.version()), changes.change_type)?;
        let change_type = changes.change_type;
        let version = WorkflowVersion::new(workflow_id.clone(), number, changes);
        let plan = self.migrator.create_migration_plan(latest.as_ref(), &version);
        let version = self
            .stores
            .versions
            .create(version.with_migration_plan(plan))
            .await?;

        record_version_created(change_type);
        info!(
            version_id = %version.id(),
            version = %version.version(),
            "Workflow version created"
        );
        Ok(version)
    }

    /// Run every check `create_version` would, without persisting anything
    #[instrument(skip(self, changes))]
    pub async fn validate_version(
        &self,
        workflow_id: &WorkflowId,
        changes: &VersionChanges,
    ) -> Result<(), DomainError> {
        self.check_changes(workflow_id, changes).await.map(|_| ())
    }

    /// Returns the latest version the change was checked against
    async fn check_changes(
        &self,
        workflow_id: &WorkflowId,
        changes: &VersionChanges,
    ) -> Result<Option<WorkflowVersion>, DomainError> {
        let workflow = self.load_workflow(workflow_id).await?;
        let latest = self.stores.versions.get_latest_version(workflow_id).await?;
        let in_flight = self.stores.tracker.count_in_flight(workflow_id).await?;

        let previous = latest
            .as_ref()
            .map(|v| v.definition())
            .or_else(|| workflow.definition());
        let context = ValidationContext {
            in_flight_executions: in_flight,
            previous,
        };
        self.validator.validate_version(&context, changes)?;

        Ok(latest)
    }

    /// Make the version live for its workflow
    #[instrument(skip(self))]
    pub async fn activate_version(&self, version_id: &VersionId) -> Result<Activation, DomainError> {
        let target = self.load_version(version_id).await?;
        let current = self
            .stores
            .versions
            .get_active_version(target.workflow_id())
            .await?;
        self.validator.validate_activation(current.as_ref(), &target)?;

        let execution = match &current {
            Some(current) => {
                let plan = self.forward_plan(current, &target);
                Some(
                    self.migrator
                        .execute_migration(&plan, Some(current), &target)
                        .await?,
                )
            }
            None => None,
        };

        let version = self
            .cut_over(&target, current.as_ref().map(|v| v.id()))
            .await?;

        record_version_activated();
        info!(
            workflow_id = %version.workflow_id(),
            version = %version.version(),
            previous = current.as_ref().map(|v| v.version()).unwrap_or("none"),
            "Workflow version activated"
        );

        Ok(Activation {
            version,
            previous: current,
            execution,
        })
    }

    /// The embedded plan if it starts from `current`, otherwise a fresh one
    fn forward_plan(&self, current: &WorkflowVersion, target: &WorkflowVersion) -> MigrationPlan {
        match target.migration_plan() {
            Some(plan)
                if plan.direction == PlanDirection::Forward
                    && plan.from_version_id.as_ref() == Some(current.id()) =>
            {
                plan.clone()
            }
            _ => {
                debug!(
                    from = %current.version(),
                    to = %target.version(),
                    "Embedded plan does not start from the active version, planning afresh"
                );
                self.migrator.create_migration_plan(Some(current), target)
            }
        }
    }

    /// Return the workflow to an older version.
    ///
    /// The rollback record is persisted whatever the outcome. A failed
    /// rollback migration leaves the workflow on its current version.
    #[instrument(skip(self, reason, executed_by))]
    pub async fn rollback_to_version(
        &self,
        workflow_id: &WorkflowId,
        target_version_id: &VersionId,
        reason: &str,
        executed_by: &str,
    ) -> Result<RollbackRecord, DomainError> {
        let target = self.load_version(target_version_id).await?;
        if target.workflow_id() != workflow_id {
            return Err(ValidationError::WorkflowMismatch {
                current: workflow_id.to_string(),
                target: target.workflow_id().to_string(),
            }
            .into());
        }

        let current = self
            .stores
            .versions
            .get_active_version(workflow_id)
            .await?
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Workflow '{}' has no active version to roll back from",
                    workflow_id
                ))
            })?;

        self.validator.validate_rollback(&current, &target)?;

        let plan = self.migrator.create_rollback_plan(&current, &target);
        let mut record = RollbackRecord {
            id: RollbackId::generate(),
            workflow_id: workflow_id.clone(),
            from_version_id: current.id().clone(),
            to_version_id: target.id().clone(),
            from_version: current.version().to_string(),
            to_version: target.version().to_string(),
            reason: reason.to_string(),
            executed_by: executed_by.to_string(),
            executed_at: Utc::now(),
            plan: plan.clone(),
            execution_id: None,
            status: RollbackStatus::Pending,
            error: None,
        };

        match self.migrator.execute_rollback(&plan, &current, &target).await {
            Ok(execution) => {
                record.execution_id = Some(execution.id().clone());
                record.complete();
            }
            Err(e) => {
                if let DomainError::Migration { execution_id, .. } = &e {
                    if !execution_id.is_empty() {
                        record.execution_id = Some(ExecutionId::new(execution_id.as_str()));
                    }
                }
                record.fail(e.to_string());
                self.stores.rollbacks.create(record).await?;
                record_rollback(false);
                warn!(
                    from = %current.version(),
                    to = %target.version(),
                    error = %e,
                    "Rollback migration failed"
                );
                return Err(e);
            }
        }

        let mut record = self.stores.rollbacks.create(record).await?;

        if let Err(e) = self.cut_over(&target, Some(current.id())).await {
            record.fail(e.to_string());
            self.stores.rollbacks.update(record).await?;
            record_rollback(false);
            warn!(error = %e, "Rollback cutover failed");
            return Err(e);
        }

        record_rollback(true);
        record_version_activated();
        info!(
            workflow_id = %workflow_id,
            from = %record.from_version,
            to = %record.to_version,
            reason = %record.reason,
            "Workflow rolled back"
        );
        Ok(record)
    }

    /// Versions of the workflow in ascending semantic-version order
    #[instrument(skip(self))]
    pub async fn get_version_history(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<WorkflowVersion>, DomainError> {
        self.load_workflow(workflow_id).await?;
        self.stores.versions.get_version_history(workflow_id).await
    }

    #[instrument(skip(self))]
    pub async fn compare_versions(
        &self,
        from_id: &VersionId,
        to_id: &VersionId,
    ) -> Result<VersionComparison, DomainError> {
        let from = self.load_version(from_id).await?;
        let to = self.load_version(to_id).await?;

        if from.workflow_id() != to.workflow_id() {
            return Err(ValidationError::WorkflowMismatch {
                current: from.workflow_id().to_string(),
                target: to.workflow_id().to_string(),
            }
            .into());
        }

        let differences = compare_definitions(from.definition(), to.definition());
        let summary = summarize_comparison(&differences);

        Ok(VersionComparison {
            from_version_id: from.id().clone(),
            to_version_id: to.id().clone(),
            from_version: from.version().to_string(),
            to_version: to.version().to_string(),
            differences,
            summary,
        })
    }

    /// Change-type based compatibility between every pair of versions
    #[instrument(skip(self))]
    pub async fn get_compatibility_matrix(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<CompatibilityMatrix, DomainError> {
        let history = self.get_version_history(workflow_id).await?;
        Ok(CompatibilityMatrix::from_versions(&history))
    }

    /// Plan stored with the version at creation time
    #[instrument(skip(self))]
    pub async fn get_migration_plan(&self, version_id: &VersionId) -> Result<MigrationPlan, DomainError> {
        let version = self.load_version(version_id).await?;
        version.migration_plan().cloned().ok_or_else(|| {
            DomainError::not_found(format!("Migration plan for version '{}'", version_id))
        })
    }

    /// Deactivate whatever is active, activate `target` and repoint the
    /// workflow. `expected_current` guards against a concurrent activation.
    async fn cut_over(
        &self,
        target: &WorkflowVersion,
        expected_current: Option<&VersionId>,
    ) -> Result<WorkflowVersion, DomainError> {
        let mut tx = self.stores.unit_of_work.begin().await?;

        match apply_cut_over(tx.as_mut(), target, expected_current).await {
            Ok(activated) => {
                tx.commit().await?;
                Ok(activated)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Failed to roll back activation transaction");
                }
                Err(e)
            }
        }
    }

    async fn load_workflow(&self, id: &WorkflowId) -> Result<Workflow, DomainError> {
        self.stores
            .workflows
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Workflow '{}'", id)))
    }

    async fn load_version(&self, id: &VersionId) -> Result<WorkflowVersion, DomainError> {
        self.stores
            .versions
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Version '{}'", id)))
    }
}

async fn apply_cut_over(
    tx: &mut dyn Transaction,
    target: &WorkflowVersion,
    expected_current: Option<&VersionId>,
) -> Result<WorkflowVersion, DomainError> {
    let workflow_id = target.workflow_id();
    let now = Utc::now();

    let current = tx.get_active_version(workflow_id).await?;
    if current.as_ref().map(|v| v.id()) != expected_current {
        return Err(DomainError::conflict(format!(
            "Active version of workflow '{}' changed during activation",
            workflow_id
        )));
    }

    let mut workflow = tx
        .get_workflow(workflow_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Workflow '{}'", workflow_id)))?;

    if let Some(mut current) = current {
        current.deactivate(now);
        tx.update_version(current).await?;
    }

    let mut activated = target.clone();
    activated.activate(now);
    tx.update_version(activated.clone()).await?;

    workflow.set_live_definition(activated.definition().clone(), activated.version());
    tx.update_workflow(workflow).await?;

    Ok(activated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    use crate::domain::comparison::CompatibilityLevel;
    use crate::domain::migration::{
        ActionHandler, ExecutionStatus, MigrationConfig, MigrationContext, MigrationError,
        MigrationExecutionRepository, MigrationStep,
    };
    use crate::domain::version::ChangeType;
    use crate::domain::workflow::{FieldType, SchemaField, StepDefinition, WorkflowDefinition};
    use crate::infrastructure::migration::HandlerRegistry;
    use crate::infrastructure::storage::InMemoryExecutionTracker;

    struct Fixture {
        store: InMemoryStore,
        tracker: InMemoryExecutionTracker,
        manager: VersionManager,
        workflow_id: WorkflowId,
    }

    struct FailingHandler;

    #[async_trait]
    impl ActionHandler for FailingHandler {
        async fn execute(
            &self,
            _context: &MigrationContext,
            step: &MigrationStep,
        ) -> Result<Value, MigrationError> {
            Err(MigrationError::step_failed(step.order, step.action.identifier(), "disk full"))
        }
    }

    /// Holds every migration at its validation step until all have arrived
    struct BarrierHandler(Arc<tokio::sync::Barrier>);

    #[async_trait]
    impl ActionHandler for BarrierHandler {
        async fn execute(
            &self,
            _context: &MigrationContext,
            _step: &MigrationStep,
        ) -> Result<Value, MigrationError> {
            self.0.wait().await;
            Ok(Value::Null)
        }
    }

    async fn fixture_with(registry: HandlerRegistry) -> Fixture {
        let store = InMemoryStore::new();
        let tracker = InMemoryExecutionTracker::new();
        let workflow_id = WorkflowId::new("orders").unwrap();
        WorkflowRepository::create(&store, Workflow::new(workflow_id.clone(), "Orders", "alice"))
            .await
            .unwrap();

        let stores = VersionStores::in_memory(&store, Arc::new(tracker.clone()));
        let config = MigrationConfig {
            retry_delay_ms: 0,
            ..Default::default()
        };
        let migrator = Migrator::new(config, Validator::default(), registry, Arc::new(store.clone()));

        Fixture {
            store,
            tracker,
            manager: VersionManager::new(stores, Validator::default(), migrator),
            workflow_id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(HandlerRegistry::with_builtins(Validator::default())).await
    }

    fn three_steps() -> WorkflowDefinition {
        WorkflowDefinition::new("orders")
            .with_step(StepDefinition::http("fetch", "GET", "https://api/orders"))
            .with_step(StepDefinition::script("transform", "map(order)"))
            .with_step(StepDefinition::condition("check", "ok"))
            .with_input_field("order_id", SchemaField::new(FieldType::String).required())
            .with_output_field("total", SchemaField::new(FieldType::Number))
    }

    fn changes(change_type: ChangeType, definition: WorkflowDefinition) -> VersionChanges {
        VersionChanges::new(change_type, definition, "alice")
    }

    impl Fixture {
        async fn create(&self, change_type: ChangeType, definition: WorkflowDefinition) -> WorkflowVersion {
            self.manager
                .create_version(&self.workflow_id, changes(change_type, definition))
                .await
                .unwrap()
        }

        async fn version(&self, id: &VersionId) -> WorkflowVersion {
            VersionRepository::get(&self.store, id).await.unwrap().unwrap()
        }

        async fn workflow(&self) -> Workflow {
            WorkflowRepository::get(&self.store, &self.workflow_id)
                .await
                .unwrap()
                .unwrap()
        }

        async fn active_count(&self) -> usize {
            self.store
                .get_version_history(&self.workflow_id)
                .await
                .unwrap()
                .iter()
                .filter(|v| v.is_active())
                .count()
        }

        /// Workflow at an active 1.0.0 with three steps
        async fn deployed(&self) -> WorkflowVersion {
            let first = self.create(ChangeType::Major, three_steps()).await;
            self.manager.activate_version(first.id()).await.unwrap().version
        }
    }

    #[tokio::test]
    async fn test_first_version_is_inactive_with_initialization_plan() {
        let f = fixture().await;
        let first = f.create(ChangeType::Major, three_steps()).await;

        assert_eq!(first.version(), "1.0.0");
        assert!(!first.is_active());
        let plan = first.migration_plan().unwrap();
        assert!(plan.is_initialization());
        assert_eq!(plan.migration_steps.len(), 1);
    }

    #[tokio::test]
    async fn test_create_version_requires_workflow() {
        let f = fixture().await;
        let missing = WorkflowId::new("missing").unwrap();
        let err = f
            .manager
            .create_version(&missing, changes(ChangeType::Major, three_steps()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_version_numbers_follow_change_type() {
        let f = fixture().await;
        f.deployed().await;

        let patch = f.create(ChangeType::Patch, three_steps()).await;
        assert_eq!(patch.version(), "1.0.1");

        let minor = f
            .create(
                ChangeType::Minor,
                three_steps().with_output_field("currency", SchemaField::new(FieldType::String)),
            )
            .await;
        assert_eq!(minor.version(), "1.1.0");

        let mut breaking = three_steps();
        breaking.input_schema.clear();
        let major = f.create(ChangeType::Major, breaking).await;
        assert_eq!(major.version(), "2.0.0");
    }

    #[tokio::test]
    async fn test_patch_scenario() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        assert_eq!(v1.version(), "1.0.0");

        let v2 = f.create(ChangeType::Patch, three_steps()).await;
        assert_eq!(v2.version(), "1.0.1");
        assert!(!v2.is_active());

        let mut removed = three_steps();
        removed.output_schema.remove("total");
        let err = f
            .manager
            .create_version(&f.workflow_id, changes(ChangeType::Patch, removed))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("patch changes must maintain full schema compatibility"));
        assert_eq!(f.store.get_version_history(&f.workflow_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_activation_swaps_active_version() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;

        let activation = f.manager.activate_version(v2.id()).await.unwrap();
        let execution = activation.execution.unwrap();
        assert_eq!(execution.status(), ExecutionStatus::Completed);
        assert_eq!(activation.previous.unwrap().id(), v1.id());

        assert!(!f.version(v1.id()).await.is_active());
        assert!(f.version(v1.id()).await.deactivated_at().is_some());
        assert!(f.version(v2.id()).await.is_active());
        assert_eq!(f.workflow().await.version(), Some("1.0.1"));
        assert_eq!(f.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_rollback_scenario() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;
        f.manager.activate_version(v2.id()).await.unwrap();

        let record = f
            .manager
            .rollback_to_version(&f.workflow_id, v1.id(), "regression", "bob")
            .await
            .unwrap();
        assert_eq!(record.status, RollbackStatus::Completed);
        assert_eq!(record.from_version, "1.0.1");
        assert_eq!(record.to_version, "1.0.0");
        assert!(record.execution_id.is_some());

        assert!(!f.version(v2.id()).await.is_active());
        assert!(f.version(v1.id()).await.is_active());
        assert_eq!(f.workflow().await.version(), Some("1.0.0"));

        let stored = f.store.list_by_workflow(&f.workflow_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].reason, "regression");
        assert_eq!(stored[0].status, RollbackStatus::Completed);
    }

    #[tokio::test]
    async fn test_single_active_after_many_activations() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;
        let v3 = f
            .create(
                ChangeType::Minor,
                three_steps().with_input_field("note", SchemaField::new(FieldType::String)),
            )
            .await;

        for id in [v2.id(), v3.id()] {
            f.manager.activate_version(id).await.unwrap();
            assert_eq!(f.active_count().await, 1);
        }
        f.manager
            .rollback_to_version(&f.workflow_id, v1.id(), "revert", "bob")
            .await
            .unwrap();
        assert_eq!(f.active_count().await, 1);
        assert!(f.version(v1.id()).await.is_active());
    }

    #[tokio::test]
    async fn test_failed_migration_leaves_state_unchanged() {
        let registry = HandlerRegistry::with_builtins(Validator::default())
            .with_handler("validate_definition", Arc::new(FailingHandler));
        let f = fixture_with(registry).await;

        // first activation runs no migration
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;
        let before = f.workflow().await;

        let err = f.manager.activate_version(v2.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::Migration { .. }));

        assert!(f.version(v1.id()).await.is_active());
        assert!(!f.version(v2.id()).await.is_active());
        assert_eq!(f.workflow().await, before);

        let executions = f.store.list_by_version(v2.id()).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status(), ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_activations_admit_one_winner() {
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let registry = HandlerRegistry::with_builtins(Validator::default())
            .with_handler("validate_definition", Arc::new(BarrierHandler(Arc::clone(&barrier))));
        let f = fixture_with(registry).await;

        // first activation runs no migration, so the barrier is not reached
        let v1 = f.deployed().await;
        let patch = f.create(ChangeType::Patch, three_steps()).await;
        let minor = f
            .create(
                ChangeType::Minor,
                three_steps().with_input_field("note", SchemaField::new(FieldType::String)),
            )
            .await;

        let (a, b) = tokio::join!(
            f.manager.activate_version(patch.id()),
            f.manager.activate_version(minor.id())
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::Conflict { .. }))));
        assert_eq!(f.active_count().await, 1);
        assert!(!f.version(v1.id()).await.is_active());

        let winner = results
            .iter()
            .find_map(|r| r.as_ref().ok())
            .map(|activation| activation.version.version().to_string());
        assert_eq!(f.workflow().await.version(), winner.as_deref());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_unchanged() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;

        f.store.fail_next_commit();
        let err = f.manager.activate_version(v2.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::Transaction { .. }));

        assert!(f.version(v1.id()).await.is_active());
        assert!(!f.version(v2.id()).await.is_active());
        assert_eq!(f.workflow().await.version(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn test_failed_rollback_migration_is_recorded() {
        let registry = HandlerRegistry::with_builtins(Validator::default())
            .with_handler("validate_definition", Arc::new(FailingHandler));
        let f = fixture_with(registry).await;
        let v1 = f.deployed().await;

        let v2 = f
            .create(
                ChangeType::Minor,
                three_steps().with_input_field("note", SchemaField::new(FieldType::String)),
            )
            .await;
        assert!(f.manager.activate_version(v2.id()).await.is_err());

        // every plan ends in validation, so reach 1.1.0 through the transaction alone
        f.manager.cut_over(&v2, Some(v1.id())).await.unwrap();

        let err = f
            .manager
            .rollback_to_version(&f.workflow_id, v1.id(), "regression", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Migration { .. }));

        let records = f.store.list_by_workflow(&f.workflow_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_failed());
        assert!(records[0].execution_id.is_some());
        assert!(f.version(v2.id()).await.is_active());
        assert_eq!(f.workflow().await.version(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_rollback_to_newer_version_is_rejected() {
        let f = fixture().await;
        f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;

        let err = f
            .manager
            .rollback_to_version(&f.workflow_id, v2.id(), "oops", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(f.store.list_by_workflow(&f.workflow_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_major_change_blocked_by_in_flight_executions() {
        let f = fixture().await;
        f.deployed().await;
        f.tracker.set_in_flight(&f.workflow_id, 2).await;

        let err = f
            .manager
            .validate_version(&f.workflow_id, &changes(ChangeType::Major, three_steps()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Compatibility { .. }));
    }

    #[tokio::test]
    async fn test_activating_active_version_is_rejected() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        assert!(f.manager.activate_version(v1.id()).await.is_err());
    }

    #[tokio::test]
    async fn test_deactivated_version_returns_only_through_rollback() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;
        f.manager.activate_version(v2.id()).await.unwrap();

        let err = f.manager.activate_version(v1.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(err.to_string().contains("rollback_to_version"));

        assert!(!f.version(v1.id()).await.is_active());
        assert!(f.version(v2.id()).await.is_active());
        assert_eq!(f.workflow().await.version(), Some("1.0.1"));
        assert!(f.store.list_by_workflow(&f.workflow_id).await.unwrap().is_empty());

        f.manager
            .rollback_to_version(&f.workflow_id, v1.id(), "regression", "bob")
            .await
            .unwrap();
        assert!(f.version(v1.id()).await.is_active());
        assert_eq!(f.store.list_by_workflow(&f.workflow_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_older_unreleased_version_cannot_be_activated() {
        let f = fixture().await;
        f.deployed().await;
        let patch = f.create(ChangeType::Patch, three_steps()).await;
        let minor = f
            .create(
                ChangeType::Minor,
                three_steps().with_input_field("note", SchemaField::new(FieldType::String)),
            )
            .await;
        f.manager.activate_version(minor.id()).await.unwrap();

        let err = f.manager.activate_version(patch.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert_eq!(f.active_count().await, 1);
        assert!(f.version(minor.id()).await.is_active());
    }

    #[tokio::test]
    async fn test_compare_versions() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f
            .create(
                ChangeType::Minor,
                three_steps().with_output_field("currency", SchemaField::new(FieldType::String)),
            )
            .await;

        let comparison = f.manager.compare_versions(v1.id(), v2.id()).await.unwrap();
        assert_eq!(comparison.summary.total, 1);
        assert_eq!(comparison.summary.compatibility, CompatibilityLevel::Full);
    }

    #[tokio::test]
    async fn test_compare_versions_across_workflows_fails() {
        let f = fixture().await;
        let v1 = f.deployed().await;

        let other_id = WorkflowId::new("billing").unwrap();
        WorkflowRepository::create(&f.store, Workflow::new(other_id.clone(), "Billing", "alice"))
            .await
            .unwrap();
        let other = f
            .manager
            .create_version(&other_id, changes(ChangeType::Major, three_steps()))
            .await
            .unwrap();

        let err = f.manager.compare_versions(v1.id(), other.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_compatibility_matrix() {
        let f = fixture().await;
        f.deployed().await;
        f.create(ChangeType::Patch, three_steps()).await;
        f.create(ChangeType::Patch, three_steps()).await;

        let matrix = f.manager.get_compatibility_matrix(&f.workflow_id).await.unwrap();
        assert_eq!(matrix.versions, vec!["1.0.0", "1.0.1", "1.0.2"]);
        assert_eq!(matrix.get("1.0.1", "1.0.2"), Some(CompatibilityLevel::Full));
        assert_eq!(matrix.get("1.0.0", "1.0.2"), Some(CompatibilityLevel::None));
        assert_eq!(matrix.get("1.0.2", "1.0.0"), Some(CompatibilityLevel::None));
    }

    #[tokio::test]
    async fn test_get_migration_plan() {
        let f = fixture().await;
        let v1 = f.deployed().await;
        let v2 = f.create(ChangeType::Patch, three_steps()).await;

        let plan = f.manager.get_migration_plan(v2.id()).await.unwrap();
        assert_eq!(plan.from_version_id.as_ref(), Some(v1.id()));
        assert_eq!(plan.rollback_steps.len(), plan.migration_steps.len());

        let missing = VersionId::new("ver-missing");
        assert!(matches!(
            f.manager.get_migration_plan(&missing).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
