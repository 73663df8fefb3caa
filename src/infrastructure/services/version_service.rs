//! Version service - lifecycle operations plus notifications, retention and metrics
//!
//! Side effects launched here run after the primary operation has returned
//! and never change its result.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::config::{AppConfig, RetentionConfig};
use crate::domain::comparison::{CompatibilityMatrix, VersionComparison};
use crate::domain::migration::{
    MigrationExecution, MigrationExecutionRepository, MigrationPlan, RollbackRecord,
    RollbackStatus,
};
use crate::domain::notification::{NotificationEvent, NotificationEventType, NotificationSink};
use crate::domain::storage::{Transaction, UnitOfWork};
use crate::domain::validation::Validator;
use crate::domain::version::{
    ChangeType, VersionChanges, VersionId, VersionRepository, WorkflowVersion,
};
use crate::domain::workflow::WorkflowId;
use crate::domain::DomainError;
use crate::infrastructure::migration::{HandlerRegistry, Migrator};
use crate::infrastructure::notification::NotificationDispatcher;

use super::version_manager::{Activation, VersionManager, VersionStores};

/// Aggregates over a workflow's version history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionMetrics {
    pub workflow_id: WorkflowId,
    pub total_versions: usize,
    pub active_version: Option<String>,
    pub major_versions: usize,
    pub minor_versions: usize,
    pub patch_versions: usize,
    pub archived_versions: usize,
    pub rollback_count: usize,
    pub failed_rollbacks: usize,
    /// Mean time between consecutive version creations
    pub average_interval_secs: Option<f64>,
}

impl VersionMetrics {
    pub fn from_history(
        workflow_id: &WorkflowId,
        history: &[WorkflowVersion],
        rollbacks: &[RollbackRecord],
    ) -> Self {
        let count = |change_type: ChangeType| {
            history
                .iter()
                .filter(|v| v.change_type() == change_type)
                .count()
        };

        let mut created: Vec<_> = history.iter().map(|v| v.created_at()).collect();
        created.sort();
        let average_interval_secs = (created.len() > 1).then(|| {
            let total_ms: i64 = created
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).num_milliseconds())
                .sum();
            total_ms as f64 / 1000.0 / (created.len() - 1) as f64
        });

        Self {
            workflow_id: workflow_id.clone(),
            total_versions: history.len(),
            active_version: history
                .iter()
                .find(|v| v.is_active())
                .map(|v| v.version().to_string()),
            major_versions: count(ChangeType::Major),
            minor_versions: count(ChangeType::Minor),
            patch_versions: count(ChangeType::Patch),
            archived_versions: history.iter().filter(|v| v.is_archived()).count(),
            rollback_count: rollbacks.len(),
            failed_rollbacks: rollbacks
                .iter()
                .filter(|r| r.status == RollbackStatus::Failed)
                .count(),
            average_interval_secs,
        }
    }
}

/// Façade over [`VersionManager`]
pub struct VersionService {
    manager: Arc<VersionManager>,
    dispatcher: NotificationDispatcher,
    retention: RetentionConfig,
}

impl std::fmt::Debug for VersionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionService")
            .field("manager", &self.manager)
            .field("notifications", &self.dispatcher.is_enabled())
            .field("retention", &self.retention)
            .finish()
    }
}

impl VersionService {
    pub fn new(
        manager: Arc<VersionManager>,
        dispatcher: NotificationDispatcher,
        retention: RetentionConfig,
    ) -> Self {
        Self {
            manager,
            dispatcher,
            retention,
        }
    }

    /// Wire a service from configuration. Spawns the notification worker,
    /// so it must be called from within a tokio runtime.
    pub fn from_config(
        config: &AppConfig,
        stores: VersionStores,
        executions: Arc<dyn MigrationExecutionRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, DomainError> {
        if config.validator.max_steps == 0 {
            return Err(DomainError::configuration("validator.max_steps must be positive"));
        }
        if config.notifications.enabled && config.notifications.queue_capacity == 0 {
            return Err(DomainError::configuration(
                "notifications.queue_capacity must be positive",
            ));
        }

        let validator = Validator::new(config.validator.clone());
        let migrator = Migrator::new(
            config.migration.clone(),
            validator.clone(),
            HandlerRegistry::with_builtins(validator.clone()),
            executions,
        );
        let manager = VersionManager::new(stores, validator, migrator);

        let dispatcher = if config.notifications.enabled {
            NotificationDispatcher::spawn(sink, config.notifications.queue_capacity).0
        } else {
            NotificationDispatcher::disabled()
        };

        Ok(Self::new(Arc::new(manager), dispatcher, config.retention.clone()))
    }

    pub fn manager(&self) -> &VersionManager {
        &self.manager
    }

    #[instrument(skip(self, changes))]
    pub async fn create_version(
        &self,
        workflow_id: &WorkflowId,
        changes: VersionChanges,
    ) -> Result<WorkflowVersion, DomainError> {
        let version = self.manager.create_version(workflow_id, changes).await?;

        self.notify(
            NotificationEventType::VersionCreated,
            workflow_id,
            json!({
                "version_id": version.id(),
                "version": version.version(),
                "change_type": version.change_type(),
                "created_by": version.created_by(),
            }),
        );
        Ok(version)
    }

    #[instrument(skip(self))]
    pub async fn activate_version(&self, version_id: &VersionId) -> Result<Activation, DomainError> {
        match self.manager.activate_version(version_id).await {
            Ok(activation) => {
                let workflow_id = activation.version.workflow_id().clone();
                if let Some(execution) = &activation.execution {
                    self.migration_succeeded(&workflow_id, execution);
                }

                self.notify(
                    NotificationEventType::VersionActivated,
                    &workflow_id,
                    json!({
                        "version_id": activation.version.id(),
                        "version": activation.version.version(),
                        "previous_version": activation.previous.as_ref().map(|v| v.version()),
                    }),
                );
                self.spawn_retention(workflow_id);
                Ok(activation)
            }
            Err(e) => {
                if migration_was_attempted(&e) {
                    if let Ok(Some(version)) = self.manager.versions().get(version_id).await {
                        self.migration_failed(version.workflow_id(), "forward", &e);
                    }
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self, reason, executed_by))]
    pub async fn rollback_to_version(
        &self,
        workflow_id: &WorkflowId,
        target_version_id: &VersionId,
        reason: &str,
        executed_by: &str,
    ) -> Result<RollbackRecord, DomainError> {
        let result = self
            .manager
            .rollback_to_version(workflow_id, target_version_id, reason, executed_by)
            .await;

        match result {
            Ok(record) => {
                if let Some(execution_id) = &record.execution_id {
                    self.notify(
                        NotificationEventType::MigrationStarted,
                        workflow_id,
                        json!({ "execution_id": execution_id, "direction": "rollback" }),
                    );
                    self.notify(
                        NotificationEventType::MigrationCompleted,
                        workflow_id,
                        json!({ "execution_id": execution_id, "direction": "rollback" }),
                    );
                }

                self.notify(
                    NotificationEventType::RollbackPerformed,
                    workflow_id,
                    json!({
                        "rollback_id": record.id,
                        "from_version": record.from_version,
                        "to_version": record.to_version,
                        "reason": record.reason,
                        "executed_by": record.executed_by,
                    }),
                );
                self.spawn_retention(workflow_id.clone());
                Ok(record)
            }
            Err(e) => {
                if migration_was_attempted(&e) {
                    self.migration_failed(workflow_id, "rollback", &e);
                }
                Err(e)
            }
        }
    }

    pub async fn get_version_history(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<WorkflowVersion>, DomainError> {
        self.manager.get_version_history(workflow_id).await
    }

    pub async fn compare_versions(
        &self,
        from_id: &VersionId,
        to_id: &VersionId,
    ) -> Result<VersionComparison, DomainError> {
        self.manager.compare_versions(from_id, to_id).await
    }

    pub async fn get_compatibility_matrix(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<CompatibilityMatrix, DomainError> {
        self.manager.get_compatibility_matrix(workflow_id).await
    }

    pub async fn get_migration_plan(&self, version_id: &VersionId) -> Result<MigrationPlan, DomainError> {
        self.manager.get_migration_plan(version_id).await
    }

    pub async fn validate_version(
        &self,
        workflow_id: &WorkflowId,
        changes: &VersionChanges,
    ) -> Result<(), DomainError> {
        self.manager.validate_version(workflow_id, changes).await
    }

    /// Rollbacks of the workflow, oldest first
    pub async fn get_rollback_history(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<RollbackRecord>, DomainError> {
        self.manager.rollbacks().list_by_workflow(workflow_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_version_metrics(&self, workflow_id: &WorkflowId) -> Result<VersionMetrics, DomainError> {
        let history = self.manager.get_version_history(workflow_id).await?;
        let rollbacks = self.get_rollback_history(workflow_id).await?;
        Ok(VersionMetrics::from_history(workflow_id, &history, &rollbacks))
    }

    /// Archive inactive versions beyond the retention limit now, returning
    /// how many were archived
    pub async fn apply_retention(&self, workflow_id: &WorkflowId) -> Result<usize, DomainError> {
        archive_old_versions(
            self.manager.versions().as_ref(),
            self.manager.unit_of_work().as_ref(),
            workflow_id,
            self.retention.keep_inactive_versions,
        )
        .await
    }

    fn spawn_retention(&self, workflow_id: WorkflowId) {
        if !self.retention.enabled {
            return;
        }

        let versions = Arc::clone(self.manager.versions());
        let unit_of_work = Arc::clone(self.manager.unit_of_work());
        let keep = self.retention.keep_inactive_versions;
        tokio::spawn(async move {
            match archive_old_versions(versions.as_ref(), unit_of_work.as_ref(), &workflow_id, keep).await {
                Ok(0) => {}
                Ok(archived) => info!(workflow_id = %workflow_id, archived, "Archived old versions"),
                Err(e) => warn!(workflow_id = %workflow_id, error = %e, "Version retention failed"),
            }
        });
    }

    fn migration_succeeded(&self, workflow_id: &WorkflowId, execution: &MigrationExecution) {
        self.notify(
            NotificationEventType::MigrationStarted,
            workflow_id,
            json!({
                "execution_id": execution.id(),
                "direction": "forward",
                "started_at": execution.started_at(),
            }),
        );
        self.notify(
            NotificationEventType::MigrationCompleted,
            workflow_id,
            json!({
                "execution_id": execution.id(),
                "direction": "forward",
                "steps": execution.step_results().len(),
                "duration_ms": execution.duration_ms(),
            }),
        );
    }

    fn migration_failed(&self, workflow_id: &WorkflowId, direction: &str, error: &DomainError) {
        let (execution_id, step) = match error {
            DomainError::Migration {
                execution_id, step, ..
            } => (execution_id.as_str(), *step),
            _ => ("", None),
        };

        self.notify(
            NotificationEventType::MigrationStarted,
            workflow_id,
            json!({ "execution_id": execution_id, "direction": direction }),
        );
        self.notify(
            NotificationEventType::MigrationFailed,
            workflow_id,
            json!({
                "execution_id": execution_id,
                "direction": direction,
                "step": step,
                "error": error.to_string(),
            }),
        );
    }

    fn notify(&self, event_type: NotificationEventType, workflow_id: &WorkflowId, payload: Value) {
        self.dispatcher
            .dispatch(NotificationEvent::new(event_type, workflow_id.clone(), payload));
    }
}

/// Archive the oldest inactive versions so at most `keep` remain unarchived.
/// The active version is never touched.
async fn archive_old_versions(
    versions: &dyn VersionRepository,
    unit_of_work: &dyn UnitOfWork,
    workflow_id: &WorkflowId,
    keep: usize,
) -> Result<usize, DomainError> {
    let mut tx = unit_of_work.begin().await?;

    match stage_archival(tx.as_mut(), versions, workflow_id, keep).await {
        Ok(0) => {
            tx.rollback().await?;
            Ok(0)
        }
        Ok(archived) => {
            tx.commit().await?;
            Ok(archived)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Failed to roll back retention transaction");
            }
            Err(e)
        }
    }
}

/// History is read while the transaction is open, so no activation can
/// commit between the read and the archive writes
async fn stage_archival(
    tx: &mut dyn Transaction,
    versions: &dyn VersionRepository,
    workflow_id: &WorkflowId,
    keep: usize,
) -> Result<usize, DomainError> {
    let active = tx.get_active_version(workflow_id).await?;
    let candidates: Vec<WorkflowVersion> = versions
        .get_version_history(workflow_id)
        .await?
        .into_iter()
        .filter(|v| !v.is_active() && !v.is_archived())
        .filter(|v| active.as_ref().map(|a| a.id()) != Some(v.id()))
        .collect();

    if candidates.len() <= keep {
        return Ok(0);
    }

    let excess = candidates.len() - keep;
    let now = Utc::now();
    for mut version in candidates.into_iter().take(excess) {
        version.archive(now);
        tx.update_version(version).await?;
    }

    Ok(excess)
}

/// Failed steps and plans cancelled by the executor both count as a
/// migration that started and failed
fn migration_was_attempted(error: &DomainError) -> bool {
    matches!(error, DomainError::Migration { .. }) || error.is_rejected_plan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::config::NotificationConfig;
    use crate::domain::migration::MigrationConfig;
    use crate::domain::notification::MockNotificationSink;
    use crate::domain::workflow::{
        FieldType, SchemaField, StepDefinition, Workflow, WorkflowDefinition, WorkflowRepository,
    };
    use crate::infrastructure::storage::{InMemoryExecutionTracker, InMemoryStore};

    struct Fixture {
        store: InMemoryStore,
        service: VersionService,
        events: mpsc::Receiver<NotificationEvent>,
        workflow_id: WorkflowId,
    }

    async fn fixture(retention: RetentionConfig) -> Fixture {
        let store = InMemoryStore::new();
        let workflow_id = WorkflowId::new("orders").unwrap();
        WorkflowRepository::create(&store, Workflow::new(workflow_id.clone(), "Orders", "alice"))
            .await
            .unwrap();

        let stores = VersionStores::in_memory(&store, Arc::new(InMemoryExecutionTracker::new()));
        let config = MigrationConfig {
            retry_delay_ms: 0,
            ..Default::default()
        };
        let migrator = Migrator::new(
            config,
            Validator::default(),
            HandlerRegistry::with_builtins(Validator::default()),
            Arc::new(store.clone()),
        );
        let manager = VersionManager::new(stores, Validator::default(), migrator);
        let (dispatcher, events) = NotificationDispatcher::channel(64);

        Fixture {
            store,
            service: VersionService::new(Arc::new(manager), dispatcher, retention),
            events,
            workflow_id,
        }
    }

    fn no_retention() -> RetentionConfig {
        RetentionConfig {
            enabled: false,
            keep_inactive_versions: 1,
        }
    }

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new("orders")
            .with_step(StepDefinition::script("transform", "map(order)"))
            .with_input_field("order_id", SchemaField::new(FieldType::String).required())
    }

    impl Fixture {
        async fn release(&self, change_type: ChangeType) -> WorkflowVersion {
            let version = self
                .service
                .create_version(
                    &self.workflow_id,
                    VersionChanges::new(change_type, definition(), "alice"),
                )
                .await
                .unwrap();
            self.service.activate_version(version.id()).await.unwrap();
            version
        }

        fn drain(&mut self) -> Vec<NotificationEventType> {
            let mut types = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                types.push(event.event_type);
            }
            types
        }
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let mut f = fixture(no_retention()).await;

        f.release(ChangeType::Major).await;
        assert_eq!(
            f.drain(),
            vec![
                NotificationEventType::VersionCreated,
                NotificationEventType::VersionActivated
            ]
        );

        f.release(ChangeType::Patch).await;
        assert_eq!(
            f.drain(),
            vec![
                NotificationEventType::VersionCreated,
                NotificationEventType::MigrationStarted,
                NotificationEventType::MigrationCompleted,
                NotificationEventType::VersionActivated
            ]
        );
    }

    #[tokio::test]
    async fn test_rollback_events_and_history() {
        let mut f = fixture(no_retention()).await;
        let v1 = f.release(ChangeType::Major).await;
        f.release(ChangeType::Patch).await;
        f.drain();

        let record = f
            .service
            .rollback_to_version(&f.workflow_id, v1.id(), "regression", "bob")
            .await
            .unwrap();
        assert_eq!(record.status, RollbackStatus::Completed);
        assert_eq!(
            f.drain(),
            vec![
                NotificationEventType::MigrationStarted,
                NotificationEventType::MigrationCompleted,
                NotificationEventType::RollbackPerformed
            ]
        );

        let history = f.service.get_rollback_history(&f.workflow_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, record.id);
    }

    #[tokio::test]
    async fn test_failed_validation_emits_nothing() {
        let mut f = fixture(no_retention()).await;
        let result = f
            .service
            .create_version(
                &f.workflow_id,
                VersionChanges::new(ChangeType::Major, WorkflowDefinition::new("orders"), "alice"),
            )
            .await;
        assert!(result.is_err());
        assert!(f.drain().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_plan_emits_migration_failed() {
        let mut f = fixture(no_retention()).await;
        let v1 = f.release(ChangeType::Major).await;
        let planned = f
            .service
            .create_version(
                &f.workflow_id,
                VersionChanges::new(ChangeType::Patch, definition(), "alice"),
            )
            .await
            .unwrap();
        f.drain();

        let mut plan = planned.migration_plan().unwrap().clone();
        plan.migration_steps[0].order = 9;
        VersionRepository::update(&f.store, planned.clone().with_migration_plan(plan))
            .await
            .unwrap();

        let err = f.service.activate_version(planned.id()).await.unwrap_err();
        assert!(err.is_rejected_plan());
        assert_eq!(
            f.drain(),
            vec![
                NotificationEventType::MigrationStarted,
                NotificationEventType::MigrationFailed
            ]
        );
        let live = VersionRepository::get(&f.store, v1.id()).await.unwrap().unwrap();
        assert!(live.is_active());
    }

    #[tokio::test]
    async fn test_version_metrics() {
        let f = fixture(no_retention()).await;
        let v1 = f.release(ChangeType::Major).await;
        f.release(ChangeType::Patch).await;
        f.release(ChangeType::Minor).await;
        f.service
            .rollback_to_version(&f.workflow_id, v1.id(), "regression", "bob")
            .await
            .unwrap();

        let metrics = f.service.get_version_metrics(&f.workflow_id).await.unwrap();
        assert_eq!(metrics.total_versions, 3);
        assert_eq!(metrics.active_version.as_deref(), Some("1.0.0"));
        assert_eq!(metrics.major_versions, 1);
        assert_eq!(metrics.minor_versions, 1);
        assert_eq!(metrics.patch_versions, 1);
        assert_eq!(metrics.rollback_count, 1);
        assert_eq!(metrics.failed_rollbacks, 0);
        assert!(metrics.average_interval_secs.is_some());
    }

    #[test]
    fn test_metrics_of_empty_history() {
        let id = WorkflowId::new("orders").unwrap();
        let metrics = VersionMetrics::from_history(&id, &[], &[]);
        assert_eq!(metrics.total_versions, 0);
        assert_eq!(metrics.active_version, None);
        assert_eq!(metrics.average_interval_secs, None);
    }

    #[tokio::test]
    async fn test_retention_archives_oldest_inactive() {
        let f = fixture(no_retention()).await;
        let v1 = f.release(ChangeType::Major).await;
        let v2 = f.release(ChangeType::Patch).await;
        let v3 = f.release(ChangeType::Patch).await;

        assert_eq!(f.service.apply_retention(&f.workflow_id).await.unwrap(), 1);
        assert_eq!(f.service.apply_retention(&f.workflow_id).await.unwrap(), 0);

        let get = |id: VersionId| {
            let store = f.store.clone();
            async move { VersionRepository::get(&store, &id).await.unwrap().unwrap() }
        };
        assert!(get(v1.id().clone()).await.is_archived());
        assert!(!get(v2.id().clone()).await.is_archived());
        let active = get(v3.id().clone()).await;
        assert!(active.is_active());
        assert!(!active.is_archived());
    }

    #[tokio::test]
    async fn test_retention_waits_for_open_activation() {
        let f = fixture(no_retention()).await;
        let v1 = f.release(ChangeType::Major).await;
        let v2 = f.release(ChangeType::Patch).await;
        let v3 = f.release(ChangeType::Patch).await;
        let get = |id: VersionId| {
            let store = f.store.clone();
            async move { VersionRepository::get(&store, &id).await.unwrap().unwrap() }
        };

        let mut tx = f.store.begin().await.unwrap();
        let retention = {
            let store = f.store.clone();
            let workflow_id = f.workflow_id.clone();
            tokio::spawn(async move { archive_old_versions(&store, &store, &workflow_id, 1).await })
        };
        tokio::task::yield_now().await;
        assert!(!retention.is_finished());

        let now = Utc::now();
        let mut current = get(v3.id().clone()).await;
        let mut previous = get(v2.id().clone()).await;
        current.deactivate(now);
        previous.activate(now);
        tx.update_version(current).await.unwrap();
        tx.update_version(previous).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(retention.await.unwrap().unwrap(), 1);
        assert!(get(v1.id().clone()).await.is_archived());
        let live = get(v2.id().clone()).await;
        assert!(live.is_active());
        assert!(!live.is_archived());
        assert!(!get(v3.id().clone()).await.is_archived());
    }

    #[tokio::test]
    async fn test_retention_runs_after_activation() {
        let f = fixture(RetentionConfig {
            enabled: true,
            keep_inactive_versions: 0,
        })
        .await;
        let v1 = f.release(ChangeType::Major).await;
        f.release(ChangeType::Patch).await;

        let archived = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let version = VersionRepository::get(&f.store, v1.id()).await.unwrap().unwrap();
                if version.is_archived() {
                    break version;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(!archived.is_active());
    }

    #[tokio::test]
    async fn test_service_from_config() {
        let store = InMemoryStore::new();
        let workflow_id = WorkflowId::new("orders").unwrap();
        WorkflowRepository::create(&store, Workflow::new(workflow_id.clone(), "Orders", "alice"))
            .await
            .unwrap();

        let mut sink = MockNotificationSink::new();
        sink.expect_notify().returning(|_| Ok(()));
        let config = AppConfig {
            notifications: NotificationConfig {
                enabled: true,
                queue_capacity: 4,
            },
            ..Default::default()
        };
        let service = VersionService::from_config(
            &config,
            VersionStores::in_memory(&store, Arc::new(InMemoryExecutionTracker::new())),
            Arc::new(store.clone()),
            Arc::new(sink),
        )
        .unwrap();

        let version = service
            .create_version(
                &workflow_id,
                VersionChanges::new(ChangeType::Major, definition(), "alice"),
            )
            .await
            .unwrap();
        service.activate_version(version.id()).await.unwrap();

        let history = service.get_version_history(&workflow_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_active());
    }

    #[tokio::test]
    async fn test_from_config_rejects_empty_notification_queue() {
        let store = InMemoryStore::new();
        let config = AppConfig {
            notifications: NotificationConfig {
                enabled: true,
                queue_capacity: 0,
            },
            ..Default::default()
        };
        let err = VersionService::from_config(
            &config,
            VersionStores::in_memory(&store, Arc::new(InMemoryExecutionTracker::new())),
            Arc::new(store.clone()),
            Arc::new(MockNotificationSink::new()),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
        assert!(!err.is_client_error());
    }
}
