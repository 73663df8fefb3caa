//! Unit of work spanning workflow and version persistence

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::version::WorkflowVersion;
use crate::domain::workflow::{Workflow, WorkflowId};
use crate::domain::DomainError;

/// A transactional context.
///
/// Writes are staged and only become visible to other readers on
/// [`Transaction::commit`]. Reads through the transaction observe its own
/// staged writes. Dropping a transaction without committing discards it.
#[async_trait]
pub trait Transaction: Send {
    async fn get_workflow(&mut self, id: &WorkflowId) -> Result<Option<Workflow>, DomainError>;

    async fn get_active_version(
        &mut self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowVersion>, DomainError>;

    async fn update_workflow(&mut self, workflow: Workflow) -> Result<(), DomainError>;

    async fn update_version(&mut self, version: WorkflowVersion) -> Result<(), DomainError>;

    /// Apply every staged write atomically
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Opens transactions. Transactions opened on the same store are serialized.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError>;
}
