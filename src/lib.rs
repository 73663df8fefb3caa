//! PMP Workflow Versioning
//!
//! Version lifecycle and migration engine for workflow definitions:
//! - Validation of definitions and version changes
//! - Structural comparison and compatibility classification
//! - Reversible migration plans executed step by step
//! - Atomic activation and rollback of workflow versions

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
