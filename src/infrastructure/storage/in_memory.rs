//! In-memory persistence adapter
//!
//! One shared store backs every repository port and the unit of work, so a
//! committed transaction is immediately visible through the repositories.
//! Data is lost when the process terminates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::domain::migration::{
    ExecutionId, MigrationExecution, MigrationExecutionRepository, RollbackRecord,
    RollbackRepository,
};
use crate::domain::storage::{Transaction, UnitOfWork};
use crate::domain::version::{compare_versions, VersionId, VersionRepository, WorkflowVersion};
use crate::domain::workflow::{Workflow, WorkflowId, WorkflowRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct StoreState {
    workflows: HashMap<WorkflowId, Workflow>,
    versions: HashMap<VersionId, WorkflowVersion>,
    executions: HashMap<ExecutionId, MigrationExecution>,
    /// Insertion ordered
    rollbacks: Vec<RollbackRecord>,
}

impl StoreState {
    fn versions_of(&self, workflow_id: &WorkflowId) -> Vec<WorkflowVersion> {
        let mut versions: Vec<WorkflowVersion> = self
            .versions
            .values()
            .filter(|v| v.workflow_id() == workflow_id)
            .cloned()
            .collect();
        sort_by_version(&mut versions);
        versions
    }
}

fn sort_by_version(versions: &mut [WorkflowVersion]) {
    versions.sort_by(|a, b| {
        compare_versions(a.version(), b.version())
            .unwrap_or_else(|_| a.version().cmp(b.version()))
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });
}

/// Thread-safe in-memory store implementing all persistence ports
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    /// Held for the lifetime of a transaction
    tx_lock: Arc<Mutex<()>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next transaction commit fail without applying its writes
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryStore {
    async fn get(&self, id: &WorkflowId) -> Result<Option<Workflow>, DomainError> {
        let state = self.state.read().await;
        Ok(state.workflows.get(id).cloned())
    }

    async fn create(&self, workflow: Workflow) -> Result<Workflow, DomainError> {
        let mut state = self.state.write().await;

        if state.workflows.contains_key(workflow.id()) {
            return Err(DomainError::conflict(format!(
                "Workflow '{}' already exists",
                workflow.id()
            )));
        }

        state.workflows.insert(workflow.id().clone(), workflow.clone());
        Ok(workflow)
    }

    async fn update(&self, workflow: Workflow) -> Result<Workflow, DomainError> {
        let mut state = self.state.write().await;

        if !state.workflows.contains_key(workflow.id()) {
            return Err(DomainError::not_found(format!("Workflow '{}'", workflow.id())));
        }

        state.workflows.insert(workflow.id().clone(), workflow.clone());
        Ok(workflow)
    }
}

#[async_trait]
impl VersionRepository for InMemoryStore {
    async fn create(&self, version: WorkflowVersion) -> Result<WorkflowVersion, DomainError> {
        let mut state = self.state.write().await;

        if state.versions.contains_key(version.id()) {
            return Err(DomainError::conflict(format!(
                "Version '{}' already exists",
                version.id()
            )));
        }

        let duplicate = state
            .versions
            .values()
            .any(|v| v.workflow_id() == version.workflow_id() && v.version() == version.version());
        if duplicate {
            return Err(DomainError::conflict(format!(
                "Workflow '{}' already has version {}",
                version.workflow_id(),
                version.version()
            )));
        }

        state.versions.insert(version.id().clone(), version.clone());
        Ok(version)
    }

    async fn get(&self, id: &VersionId) -> Result<Option<WorkflowVersion>, DomainError> {
        let state = self.state.read().await;
        Ok(state.versions.get(id).cloned())
    }

    async fn get_latest_version(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowVersion>, DomainError> {
        let state = self.state.read().await;
        Ok(state.versions_of(workflow_id).pop())
    }

    async fn get_active_version(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowVersion>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .values()
            .find(|v| v.workflow_id() == workflow_id && v.is_active())
            .cloned())
    }

    async fn get_version_history(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<WorkflowVersion>, DomainError> {
        let state = self.state.read().await;
        Ok(state.versions_of(workflow_id))
    }

    async fn update(&self, version: WorkflowVersion) -> Result<WorkflowVersion, DomainError> {
        let mut state = self.state.write().await;

        let Some(existing) = state.versions.get(version.id()) else {
            return Err(DomainError::not_found(format!("Version '{}'", version.id())));
        };

        if existing.is_active() != version.is_active() {
            return Err(DomainError::conflict(format!(
                "Activation state of version '{}' can only change inside a transaction",
                version.id()
            )));
        }

        state.versions.insert(version.id().clone(), version.clone());
        Ok(version)
    }
}

#[async_trait]
impl MigrationExecutionRepository for InMemoryStore {
    async fn create(&self, execution: MigrationExecution) -> Result<MigrationExecution, DomainError> {
        let mut state = self.state.write().await;

        if state.executions.contains_key(execution.id()) {
            return Err(DomainError::conflict(format!(
                "Execution '{}' already exists",
                execution.id()
            )));
        }

        state.executions.insert(execution.id().clone(), execution.clone());
        Ok(execution)
    }

    async fn update(&self, execution: MigrationExecution) -> Result<MigrationExecution, DomainError> {
        let mut state = self.state.write().await;

        if !state.executions.contains_key(execution.id()) {
            return Err(DomainError::not_found(format!("Execution '{}'", execution.id())));
        }

        state.executions.insert(execution.id().clone(), execution.clone());
        Ok(execution)
    }

    async fn get(&self, id: &ExecutionId) -> Result<Option<MigrationExecution>, DomainError> {
        let state = self.state.read().await;
        Ok(state.executions.get(id).cloned())
    }

    async fn list_by_version(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<MigrationExecution>, DomainError> {
        let state = self.state.read().await;
        let mut executions: Vec<MigrationExecution> = state
            .executions
            .values()
            .filter(|e| e.to_version_id() == version_id)
            .cloned()
            .collect();
        executions.sort_by_key(|e| e.started_at());
        Ok(executions)
    }
}

#[async_trait]
impl RollbackRepository for InMemoryStore {
    async fn create(&self, record: RollbackRecord) -> Result<RollbackRecord, DomainError> {
        let mut state = self.state.write().await;

        if state.rollbacks.iter().any(|r| r.id == record.id) {
            return Err(DomainError::conflict(format!(
                "Rollback '{}' already exists",
                record.id
            )));
        }

        state.rollbacks.push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: RollbackRecord) -> Result<RollbackRecord, DomainError> {
        let mut state = self.state.write().await;

        let Some(existing) = state.rollbacks.iter_mut().find(|r| r.id == record.id) else {
            return Err(DomainError::not_found(format!("Rollback '{}'", record.id)));
        };

        *existing = record.clone();
        Ok(record)
    }

    async fn list_by_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<RollbackRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .rollbacks
            .iter()
            .filter(|r| &r.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        let guard = Arc::clone(&self.tx_lock).lock_owned().await;

        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            fail_commit: Arc::clone(&self.fail_next_commit),
            workflows: HashMap::new(),
            versions: HashMap::new(),
            _guard: guard,
        }))
    }
}

/// Staged writes over the shared store
struct InMemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    fail_commit: Arc<AtomicBool>,
    workflows: HashMap<WorkflowId, Workflow>,
    versions: HashMap<VersionId, WorkflowVersion>,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryTransaction {
    /// Committed versions of the workflow overlaid with staged ones
    fn overlay(&self, state: &StoreState, workflow_id: &WorkflowId) -> Vec<WorkflowVersion> {
        let mut versions: Vec<WorkflowVersion> = state
            .versions
            .values()
            .filter(|v| v.workflow_id() == workflow_id && !self.versions.contains_key(v.id()))
            .cloned()
            .collect();
        versions.extend(
            self.versions
                .values()
                .filter(|v| v.workflow_id() == workflow_id)
                .cloned(),
        );
        versions
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn get_workflow(&mut self, id: &WorkflowId) -> Result<Option<Workflow>, DomainError> {
        if let Some(workflow) = self.workflows.get(id) {
            return Ok(Some(workflow.clone()));
        }

        let state = self.state.read().await;
        Ok(state.workflows.get(id).cloned())
    }

    async fn get_active_version(
        &mut self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowVersion>, DomainError> {
        let state = self.state.read().await;
        Ok(self
            .overlay(&state, workflow_id)
            .into_iter()
            .find(|v| v.is_active()))
    }

    async fn update_workflow(&mut self, workflow: Workflow) -> Result<(), DomainError> {
        let exists = self.state.read().await.workflows.contains_key(workflow.id());
        if !exists {
            return Err(DomainError::not_found(format!("Workflow '{}'", workflow.id())));
        }

        self.workflows.insert(workflow.id().clone(), workflow);
        Ok(())
    }

    async fn update_version(&mut self, version: WorkflowVersion) -> Result<(), DomainError> {
        let exists = self.state.read().await.versions.contains_key(version.id());
        if !exists {
            return Err(DomainError::not_found(format!("Version '{}'", version.id())));
        }

        self.versions.insert(version.id().clone(), version);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        if self.fail_commit.swap(false, AtomicOrdering::SeqCst) {
            return Err(DomainError::transaction("Commit failed"));
        }

        let shared = Arc::clone(&self.state);
        let mut state = shared.write().await;

        let mut touched: Vec<&WorkflowId> = self.versions.values().map(|v| v.workflow_id()).collect();
        touched.sort();
        touched.dedup();

        for workflow_id in touched {
            let active = self
                .overlay(&state, workflow_id)
                .iter()
                .filter(|v| v.is_active())
                .count();
            if active > 1 {
                return Err(DomainError::transaction(format!(
                    "Commit would leave workflow '{}' with {} active versions",
                    workflow_id, active
                )));
            }
        }

        let workflows = self.workflows.len();
        let versions = self.versions.len();
        let this = *self;
        state.workflows.extend(this.workflows);
        state.versions.extend(this.versions);

        debug!(workflows, versions, "Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        debug!(
            workflows = self.workflows.len(),
            versions = self.versions.len(),
            "Transaction rolled back"
        );
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransaction")
            .field("workflows", &self.workflows.len())
            .field("versions", &self.versions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::version::{ChangeType, VersionChanges};
    use crate::domain::workflow::{StepDefinition, WorkflowDefinition};
    use chrono::Utc;

    fn workflow_id() -> WorkflowId {
        WorkflowId::new("orders").unwrap()
    }

    fn version(number: &str) -> WorkflowVersion {
        let definition = WorkflowDefinition::new("orders")
            .with_step(StepDefinition::script("run", "go()"));
        WorkflowVersion::new(
            workflow_id(),
            number,
            VersionChanges::new(ChangeType::Minor, definition, "alice"),
        )
    }

    async fn seeded() -> (InMemoryStore, WorkflowVersion, WorkflowVersion) {
        let store = InMemoryStore::new();
        WorkflowRepository::create(&store, Workflow::new(workflow_id(), "Orders", "alice"))
            .await
            .unwrap();

        let mut first = version("1.0.0");
        first.activate(Utc::now());
        let first = VersionRepository::create(&store, first).await.unwrap();
        let second = VersionRepository::create(&store, version("1.1.0")).await.unwrap();
        (store, first, second)
    }

    #[tokio::test]
    async fn test_history_is_sorted_by_semver() {
        let store = InMemoryStore::new();
        for number in ["1.10.0", "1.2.0", "1.9.1"] {
            VersionRepository::create(&store, version(number)).await.unwrap();
        }

        let history = store.get_version_history(&workflow_id()).await.unwrap();
        let numbers: Vec<&str> = history.iter().map(|v| v.version()).collect();
        assert_eq!(numbers, vec!["1.2.0", "1.9.1", "1.10.0"]);

        let latest = store.get_latest_version(&workflow_id()).await.unwrap().unwrap();
        assert_eq!(latest.version(), "1.10.0");
    }

    #[tokio::test]
    async fn test_duplicate_version_number_conflicts() {
        let store = InMemoryStore::new();
        VersionRepository::create(&store, version("1.0.0")).await.unwrap();
        let err = VersionRepository::create(&store, version("1.0.0")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let (store, mut first, mut second) = seeded().await;
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        first.deactivate(now);
        second.activate(now);
        tx.update_version(first).await.unwrap();
        tx.update_version(second.clone()).await.unwrap();

        let in_tx = tx.get_active_version(&workflow_id()).await.unwrap().unwrap();
        assert_eq!(in_tx.id(), second.id());

        let outside = store.get_active_version(&workflow_id()).await.unwrap().unwrap();
        assert_eq!(outside.version(), "1.0.0");

        tx.commit().await.unwrap();
        let after = store.get_active_version(&workflow_id()).await.unwrap().unwrap();
        assert_eq!(after.version(), "1.1.0");
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let (store, mut first, mut second) = seeded().await;
        let now = Utc::now();
        store.fail_next_commit();

        let mut tx = store.begin().await.unwrap();
        first.deactivate(now);
        second.activate(now);
        tx.update_version(first).await.unwrap();
        tx.update_version(second).await.unwrap();

        assert!(matches!(tx.commit().await, Err(DomainError::Transaction { .. })));
        let active = store.get_active_version(&workflow_id()).await.unwrap().unwrap();
        assert_eq!(active.version(), "1.0.0");
    }

    #[tokio::test]
    async fn test_commit_rejects_two_active_versions() {
        let (store, _first, mut second) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        second.activate(Utc::now());
        tx.update_version(second).await.unwrap();

        assert!(tx.commit().await.is_err());
        let history = store.get_version_history(&workflow_id()).await.unwrap();
        assert_eq!(history.iter().filter(|v| v.is_active()).count(), 1);
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let (store, _, _) = seeded().await;

        let tx = store.begin().await.unwrap();
        let waiting = {
            let store = store.clone();
            tokio::spawn(async move { store.begin().await.map(|_| ()) })
        };

        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        tx.rollback().await.unwrap();
        waiting.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_plain_update_cannot_flip_activation() {
        let (store, _, mut second) = seeded().await;
        second.activate(Utc::now());
        let err = VersionRepository::update(&store, second).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }
}
