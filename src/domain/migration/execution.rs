//! Migration execution records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::MigrationError;
use super::plan::{MigrationPlan, MigrationStep, PlanDirection, PlanId, StepId};
use crate::domain::id::string_id;
use crate::domain::version::VersionId;
use crate::domain::workflow::WorkflowId;

string_id!(
    /// Identifier of a migration execution
    ExecutionId,
    "exec"
);

/// Status of a migration execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// A rollback plan ran to completion
    RolledBack,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::RolledBack
        )
    }

    /// Terminal states that count as success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack)
    }

    pub fn can_transition_to(&self, target: ExecutionStatus) -> bool {
        match (self, target) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Cancelled) => true,

            (Self::Running, Self::Completed) => true,
            (Self::Running, Self::Failed) => true,
            (Self::Running, Self::Cancelled) => true,
            (Self::Running, Self::RolledBack) => true,

            _ => false,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::RolledBack => "rolled_back",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a single executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// Result of running one migration step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: StepId,
    pub order: u32,
    pub action: String,
    pub status: StepStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Number of handler invocations, retries included
    pub attempts: u32,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn success(
        step: &MigrationStep,
        output: Value,
        attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::finish(step, StepStatus::Completed, Some(output), None, attempts, started_at)
    }

    pub fn failure(
        step: &MigrationStep,
        error: impl Into<String>,
        attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::finish(step, StepStatus::Failed, None, Some(error.into()), attempts, started_at)
    }

    fn finish(
        step: &MigrationStep,
        status: StepStatus,
        output: Option<Value>,
        error: Option<String>,
        attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            step_id: step.id.clone(),
            order: step.order,
            action: step.action.identifier(),
            status,
            output,
            error,
            attempts,
            started_at,
            completed_at,
            duration_ms: elapsed_ms(started_at, completed_at),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

/// Audit record of one attempt to run a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationExecution {
    id: ExecutionId,
    plan_id: PlanId,
    workflow_id: WorkflowId,

    #[serde(skip_serializing_if = "Option::is_none")]
    from_version_id: Option<VersionId>,

    to_version_id: VersionId,
    direction: PlanDirection,
    status: ExecutionStatus,
    started_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,

    step_results: Vec<StepResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    /// Order of the step that failed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_step: Option<u32>,
}

impl MigrationExecution {
    /// Create a pending execution of the plan
    pub fn new(plan: &MigrationPlan) -> Self {
        Self {
            id: ExecutionId::generate(),
            plan_id: plan.id.clone(),
            workflow_id: plan.workflow_id.clone(),
            from_version_id: plan.from_version_id.clone(),
            to_version_id: plan.to_version_id.clone(),
            direction: plan.direction,
            status: ExecutionStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            step_results: Vec::new(),
            error: None,
            failed_step: None,
        }
    }

    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    pub fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn from_version_id(&self) -> Option<&VersionId> {
        self.from_version_id.as_ref()
    }

    pub fn to_version_id(&self) -> &VersionId {
        &self.to_version_id
    }

    pub fn direction(&self) -> PlanDirection {
        self.direction
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn step_results(&self) -> &[StepResult] {
        &self.step_results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn failed_step(&self) -> Option<u32> {
        self.failed_step
    }

    fn transition(&mut self, target: ExecutionStatus) -> Result<(), MigrationError> {
        if !self.status.can_transition_to(target) {
            return Err(MigrationError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }

        self.status = target;
        Ok(())
    }

    fn close(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = Some(elapsed_ms(self.started_at, now));
    }

    pub fn mark_running(&mut self) -> Result<(), MigrationError> {
        self.transition(ExecutionStatus::Running)?;
        self.started_at = Utc::now();
        Ok(())
    }

    /// Append a step result; only allowed while running
    pub fn record_step(&mut self, result: StepResult) -> Result<(), MigrationError> {
        if self.status != ExecutionStatus::Running {
            return Err(MigrationError::InvalidTransition {
                from: self.status.to_string(),
                to: "step recorded".to_string(),
            });
        }

        self.step_results.push(result);
        Ok(())
    }

    /// Mark success: `completed` for forward plans, `rolled_back` for rollback plans
    pub fn mark_succeeded(&mut self) -> Result<(), MigrationError> {
        let target = match self.direction {
            PlanDirection::Forward => ExecutionStatus::Completed,
            PlanDirection::Rollback => ExecutionStatus::RolledBack,
        };
        self.transition(target)?;
        self.close();
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        failed_step: Option<u32>,
    ) -> Result<(), MigrationError> {
        self.transition(ExecutionStatus::Failed)?;
        self.error = Some(error.into());
        self.failed_step = failed_step;
        self.close();
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), MigrationError> {
        self.transition(ExecutionStatus::Cancelled)?;
        self.error = Some(reason.into());
        self.close();
        Ok(())
    }
}
