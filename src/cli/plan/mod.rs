//! Plan command - migration plan between two definitions

use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;

use crate::domain::migration::MigrationPlanner;
use crate::domain::version::{next_version, ChangeType, VersionChanges, WorkflowVersion, INITIAL_VERSION};
use crate::domain::workflow::WorkflowId;

#[derive(Args, Clone)]
pub struct PlanArgs {
    /// Current definition (JSON)
    pub from: PathBuf,

    /// Proposed definition (JSON)
    pub to: PathBuf,

    /// Declared change type of the proposed definition
    #[arg(long, default_value = "minor")]
    pub change_type: String,

    /// Workflow identifier recorded in the plan
    #[arg(long, default_value = "workflow")]
    pub workflow_id: String,

    /// Print the rollback plan from the proposed definition back to the current one
    #[arg(long)]
    pub rollback: bool,
}

pub async fn run(args: PlanArgs) -> anyhow::Result<()> {
    let config = super::init()?;
    let change_type = ChangeType::from_str(&args.change_type)?;
    let workflow_id = WorkflowId::new(args.workflow_id)?;

    let from = WorkflowVersion::new(
        workflow_id.clone(),
        INITIAL_VERSION,
        VersionChanges::new(ChangeType::Major, super::read_definition(&args.from)?, "cli"),
    );
    let to = WorkflowVersion::new(
        workflow_id,
        next_version(Some(from.version()), change_type)?,
        VersionChanges::new(change_type, super::read_definition(&args.to)?, "cli"),
    );

    let planner = MigrationPlanner::new(config.migration);
    let plan = if args.rollback {
        planner.create_rollback_plan(&to, &from)
    } else {
        planner.create_migration_plan(Some(&from), &to)
    };

    super::print_json(&plan)
}
