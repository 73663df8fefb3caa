//! Workflow domain module
//!
//! A workflow is a named, owned entity whose executable definition is versioned.
//! Definitions are structured documents: an ordered list of typed steps plus
//! input and output schemas whose fields declare one of a fixed set of types.

mod definition;
mod entity;
pub mod repository;

pub use definition::{
    parse_definition, ConditionStep, CustomStep, FieldType, HttpStep, LoopStep, ParallelStep,
    Schema, SchemaField, ScriptStep, StepDefinition, StepKind, WorkflowDefinition,
    ALLOWED_FIELD_TYPES, ALLOWED_STEP_TYPES,
};
pub use entity::{validate_workflow_id, Workflow, WorkflowId, MAX_ID_LENGTH};
pub use repository::{ExecutionTracker, WorkflowRepository};
