//! Action handler port

use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use super::error::MigrationError;
use super::plan::{MigrationPlan, MigrationStep, PlanDirection};
use crate::domain::workflow::{WorkflowDefinition, WorkflowId};

/// What a handler sees while a plan runs
#[derive(Debug, Clone)]
pub struct MigrationContext {
    pub workflow_id: WorkflowId,
    pub direction: PlanDirection,
    /// Definition being migrated away from; absent on initialization
    pub source: Option<WorkflowDefinition>,
    pub target: WorkflowDefinition,
}

impl MigrationContext {
    pub fn for_plan(
        plan: &MigrationPlan,
        source: Option<WorkflowDefinition>,
        target: WorkflowDefinition,
    ) -> Self {
        Self {
            workflow_id: plan.workflow_id.clone(),
            direction: plan.direction,
            source,
            target,
        }
    }
}

/// Executes one kind of migration action
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the step, returning a JSON summary of what was done
    async fn execute(
        &self,
        context: &MigrationContext,
        step: &MigrationStep,
    ) -> Result<Value, MigrationError>;
}
