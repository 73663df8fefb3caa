//! Simulate command - full version lifecycle against the in-memory store

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use tracing::info;

use crate::domain::version::{ChangeType, VersionChanges};
use crate::domain::workflow::{Workflow, WorkflowId, WorkflowRepository};
use crate::infrastructure::notification::TracingNotificationSink;
use crate::infrastructure::services::{VersionService, VersionStores};
use crate::infrastructure::storage::{InMemoryExecutionTracker, InMemoryStore};

#[derive(Args, Clone)]
pub struct SimulateArgs {
    /// Definition of the first version (JSON)
    pub first: PathBuf,

    /// Definition of the second version (JSON)
    pub second: PathBuf,

    /// Declared change type of the second version
    #[arg(long, default_value = "minor")]
    pub change_type: String,

    /// Workflow identifier to simulate under
    #[arg(long, default_value = "workflow")]
    pub workflow_id: String,

    /// Skip rolling back to the first version at the end
    #[arg(long)]
    pub no_rollback: bool,
}

pub async fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let config = super::init()?;
    let change_type = ChangeType::from_str(&args.change_type)?;
    let workflow_id = WorkflowId::new(args.workflow_id)?;
    let first = super::read_definition(&args.first)?;
    let second = super::read_definition(&args.second)?;

    let store = InMemoryStore::new();
    WorkflowRepository::create(
        &store,
        Workflow::new(workflow_id.clone(), first.name.clone(), "cli"),
    )
    .await?;

    let service = VersionService::from_config(
        &config,
        VersionStores::in_memory(&store, Arc::new(InMemoryExecutionTracker::new())),
        Arc::new(store.clone()),
        Arc::new(TracingNotificationSink::new()),
    )?;

    let v1 = service
        .create_version(&workflow_id, VersionChanges::new(ChangeType::Major, first, "cli"))
        .await?;
    service.activate_version(v1.id()).await?;

    let v2 = service
        .create_version(&workflow_id, VersionChanges::new(change_type, second, "cli"))
        .await?;
    let activation = service.activate_version(v2.id()).await?;
    info!(version = %activation.version.version(), "Second version live");

    if !args.no_rollback {
        service
            .rollback_to_version(&workflow_id, v1.id(), "simulation", "cli")
            .await?;
    }

    let history = service.get_version_history(&workflow_id).await?;
    let comparison = service.compare_versions(v1.id(), v2.id()).await?;
    let compatibility = service.get_compatibility_matrix(&workflow_id).await?;
    let rollbacks = service.get_rollback_history(&workflow_id).await?;
    let metrics = service.get_version_metrics(&workflow_id).await?;

    super::print_json(&json!({
        "history": history,
        "comparison": comparison,
        "compatibility": compatibility,
        "rollbacks": rollbacks,
        "metrics": metrics,
    }))
}
