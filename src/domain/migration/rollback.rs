//! Rollback audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::execution::ExecutionId;
use super::plan::MigrationPlan;
use crate::domain::id::string_id;
use crate::domain::version::VersionId;
use crate::domain::workflow::WorkflowId;

string_id!(
    /// Identifier of a rollback record
    RollbackId,
    "rb"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// Audit entry for one rollback attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub id: RollbackId,
    pub workflow_id: WorkflowId,
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    pub from_version: String,
    pub to_version: String,
    pub reason: String,
    pub executed_by: String,
    pub executed_at: DateTime<Utc>,
    pub plan: MigrationPlan,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<ExecutionId>,

    pub status: RollbackStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RollbackRecord {
    pub fn is_failed(&self) -> bool {
        self.status == RollbackStatus::Failed
    }

    pub fn complete(&mut self) {
        self.status = RollbackStatus::Completed;
        self.error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RollbackStatus::Failed;
        self.error = Some(error.into());
    }
}
