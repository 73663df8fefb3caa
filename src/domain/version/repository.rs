//! Version repository trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{VersionId, WorkflowVersion};
use crate::domain::workflow::WorkflowId;
use crate::domain::DomainError;

/// Repository for workflow version persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Persist a new version
    async fn create(&self, version: WorkflowVersion) -> Result<WorkflowVersion, DomainError>;

    /// Get a version by ID
    async fn get(&self, id: &VersionId) -> Result<Option<WorkflowVersion>, DomainError>;

    /// Highest version of the workflow by semantic-version precedence
    async fn get_latest_version(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowVersion>, DomainError>;

    /// The version currently flagged active, if any
    async fn get_active_version(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowVersion>, DomainError>;

    /// All versions of the workflow in ascending semantic-version order
    async fn get_version_history(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<WorkflowVersion>, DomainError>;

    /// Update an existing version outside of a transaction (retention bookkeeping).
    /// Activation flags are only changed through [`crate::domain::storage::Transaction`].
    async fn update(&self, version: WorkflowVersion) -> Result<WorkflowVersion, DomainError>;
}
