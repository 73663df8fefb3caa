//! Version lifecycle notification events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::workflow::WorkflowId;

/// Lifecycle events published by the version service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEventType {
    /// A new inactive version was persisted
    VersionCreated,
    /// A version became the live one
    VersionActivated,
    MigrationStarted,
    MigrationCompleted,
    MigrationFailed,
    /// A rollback completed its cutover
    RollbackPerformed,
}

impl NotificationEventType {
    pub fn all() -> Vec<Self> {
        vec![
            Self::VersionCreated,
            Self::VersionActivated,
            Self::MigrationStarted,
            Self::MigrationCompleted,
            Self::MigrationFailed,
            Self::RollbackPerformed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VersionCreated => "version_created",
            Self::VersionActivated => "version_activated",
            Self::MigrationStarted => "migration_started",
            Self::MigrationCompleted => "migration_completed",
            Self::MigrationFailed => "migration_failed",
            Self::RollbackPerformed => "rollback_performed",
        }
    }
}

impl std::fmt::Display for NotificationEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event plus its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event_type: NotificationEventType,
    pub workflow_id: WorkflowId,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(event_type: NotificationEventType, workflow_id: WorkflowId, payload: Value) -> Self {
        Self {
            event_type,
            workflow_id,
            payload,
            occurred_at: Utc::now(),
        }
    }
}
