//! CLI module for the workflow versioning engine
//!
//! Subcommands operate on JSON workflow definition files:
//! - `validate`: structural validation of one definition
//! - `compare`: differences between two definitions
//! - `plan`: migration plan between two definitions
//! - `simulate`: create, activate and roll back versions in memory

pub mod compare;
pub mod plan;
pub mod simulate;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::workflow::{parse_definition, WorkflowDefinition};
use crate::infrastructure::logging;

/// PMP Workflow Versioning - version lifecycle and migration engine
#[derive(Parser)]
#[command(name = "pmp-workflow-versioning")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a workflow definition
    Validate(validate::ValidateArgs),

    /// Compare two workflow definitions
    Compare(compare::CompareArgs),

    /// Build the migration plan between two definitions
    Plan(plan::PlanArgs),

    /// Run a create/activate/rollback cycle against an in-memory store
    Simulate(simulate::SimulateArgs),
}

/// Load configuration and install logging
fn init() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging)?;
    Ok(config)
}

fn read_definition(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    parse_definition(&document).with_context(|| format!("Invalid definition in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
