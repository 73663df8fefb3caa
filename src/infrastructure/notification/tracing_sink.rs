//! Notification sink that writes events to the log

use async_trait::async_trait;
use tracing::info;

use crate::domain::notification::{NotificationEvent, NotificationSink};
use crate::domain::DomainError;

#[derive(Debug, Clone, Default)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, event: NotificationEvent) -> Result<(), DomainError> {
        info!(
            event_type = %event.event_type,
            workflow_id = %event.workflow_id,
            occurred_at = %event.occurred_at,
            payload = %event.payload,
            "Workflow version event"
        );
        Ok(())
    }
}
