//! Version lifecycle metrics
//!
//! Only the `metrics` facade is used here; installing an exporter is left to
//! the embedding application.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::domain::migration::{ExecutionStatus, PlanDirection};
use crate::domain::version::ChangeType;

pub fn record_version_created(change_type: ChangeType) {
    counter!("workflow_versions_created_total", "change_type" => change_type.as_str()).increment(1);
}

pub fn record_version_activated() {
    counter!("workflow_versions_activated_total").increment(1);
}

/// Record a finished migration execution
pub fn record_migration(direction: PlanDirection, status: ExecutionStatus, duration: Duration) {
    let labels = [
        ("direction", direction_label(direction).to_string()),
        ("status", status.to_string()),
    ];

    histogram!("workflow_migration_duration_seconds", &labels).record(duration.as_secs_f64());

    if !status.is_success() {
        counter!("workflow_migrations_failed_total", &labels).increment(1);
    }
}

pub fn record_rollback(success: bool) {
    counter!(
        "workflow_rollbacks_total",
        "status" => if success { "completed" } else { "failed" }
    )
    .increment(1);
}

fn direction_label(direction: PlanDirection) -> &'static str {
    match direction {
        PlanDirection::Forward => "forward",
        PlanDirection::Rollback => "rollback",
    }
}
