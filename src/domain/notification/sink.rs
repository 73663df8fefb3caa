//! Notification sink port

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::event::NotificationEvent;
use crate::domain::DomainError;

/// Accepts lifecycle events. Delivery guarantees belong to the implementation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), DomainError>;
}
