//! Migration domain: plans, execution records and the plan builder

mod error;
mod execution;
mod handler;
mod plan;
mod planner;
pub mod repository;
mod rollback;

pub use error::MigrationError;
pub use execution::{ExecutionId, ExecutionStatus, MigrationExecution, StepResult, StepStatus};
pub use handler::{ActionHandler, MigrationContext};
pub use plan::{
    high_risk_step_count, MigrationAction, MigrationPlan, MigrationStep, MigrationStepType, PlanDirection, PlanId,
    RiskLevel, StepId, ValidationRule,
};
pub use planner::{
    MigrationConfig, MigrationPlanner, PREREQ_BACKUP_VERIFICATION, PREREQ_CREATE_BACKUP,
    PREREQ_EXECUTION_PAUSE, PREREQ_PAUSE_EXECUTIONS, PREREQ_VALIDATE_PERMISSIONS,
};
pub use repository::{MigrationExecutionRepository, RollbackRepository};
pub use rollback::{RollbackId, RollbackRecord, RollbackStatus};

#[cfg(test)]
pub use handler::MockActionHandler;
#[cfg(test)]
pub use repository::MockMigrationExecutionRepository;
