//! Migration audit repositories

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::execution::{ExecutionId, MigrationExecution};
use super::rollback::RollbackRecord;
use crate::domain::version::VersionId;
use crate::domain::workflow::WorkflowId;
use crate::domain::DomainError;

/// Repository for migration execution records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MigrationExecutionRepository: Send + Sync {
    async fn create(&self, execution: MigrationExecution) -> Result<MigrationExecution, DomainError>;

    async fn update(&self, execution: MigrationExecution) -> Result<MigrationExecution, DomainError>;

    async fn get(&self, id: &ExecutionId) -> Result<Option<MigrationExecution>, DomainError>;

    /// Executions targeting the given version, oldest first
    async fn list_by_version(
        &self,
        version_id: &VersionId,
    ) -> Result<Vec<MigrationExecution>, DomainError>;
}

/// Repository for rollback audit records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RollbackRepository: Send + Sync {
    async fn create(&self, record: RollbackRecord) -> Result<RollbackRecord, DomainError>;

    async fn update(&self, record: RollbackRecord) -> Result<RollbackRecord, DomainError>;

    /// Rollbacks of the workflow, oldest first
    async fn list_by_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<RollbackRecord>, DomainError>;
}
