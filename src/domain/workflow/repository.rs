//! Workflow persistence ports

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{Workflow, WorkflowId};
use crate::domain::DomainError;

/// Repository trait for workflow persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Get a workflow by ID
    async fn get(&self, id: &WorkflowId) -> Result<Option<Workflow>, DomainError>;

    /// Create a new workflow
    async fn create(&self, workflow: Workflow) -> Result<Workflow, DomainError>;

    /// Update an existing workflow outside of a transaction. The live definition
    /// pointer is only changed through [`crate::domain::storage::Transaction`].
    async fn update(&self, workflow: Workflow) -> Result<Workflow, DomainError>;
}

/// View onto the execution engine's runs, used to hold back breaking changes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExecutionTracker: Send + Sync {
    /// Number of non-terminal executions of the workflow
    async fn count_in_flight(&self, workflow_id: &WorkflowId) -> Result<usize, DomainError>;
}
