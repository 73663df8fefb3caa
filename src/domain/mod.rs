//! Domain layer - Versioning model, policy and persistence ports

pub mod comparison;
pub mod error;
pub(crate) mod id;
pub mod migration;
pub mod notification;
pub mod storage;
pub mod validation;
pub mod version;
pub mod workflow;

pub use comparison::{
    compare_definitions, summarize_comparison, CompatibilityLevel, CompatibilityMatrix,
    ComparisonSummary, DifferenceKind, DifferenceType, ImpactLevel, VersionComparison,
    VersionDifference,
};
pub use error::DomainError;
pub use migration::{
    ActionHandler, ExecutionStatus, MigrationAction, MigrationConfig, MigrationContext,
    MigrationError, MigrationExecution, MigrationExecutionRepository, MigrationPlan,
    MigrationPlanner, MigrationStep, MigrationStepType, RiskLevel, RollbackRecord,
    RollbackRepository, RollbackStatus, StepResult,
};
pub use notification::{NotificationEvent, NotificationEventType, NotificationSink};
pub use storage::{Transaction, UnitOfWork};
pub use validation::{ValidationContext, ValidationError, Validator, ValidatorConfig};
pub use version::{
    next_version, ChangeType, VersionChanges, VersionId, VersionRepository, WorkflowVersion,
};
pub use workflow::{
    parse_definition, ExecutionTracker, StepDefinition, Workflow, WorkflowDefinition, WorkflowId,
    WorkflowRepository,
};
