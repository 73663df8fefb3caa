//! Fire-and-forget notification queue

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::notification::{NotificationEvent, NotificationSink};

/// Hands events to a background worker without waiting for delivery.
///
/// Cloning shares the queue. The worker stops once every clone is dropped.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: Option<mpsc::Sender<NotificationEvent>>,
}

impl NotificationDispatcher {
    /// Spawn a worker draining a queue of `capacity` events into `sink`.
    /// Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn NotificationSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (dispatcher, receiver) = Self::channel(capacity);
        let worker = tokio::spawn(run_worker(receiver, sink));
        (dispatcher, worker)
    }

    /// Dispatcher and the receiving end of its queue, for callers that
    /// drain events themselves
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Dispatcher that discards every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue an event. Returns whether it was accepted; a full or closed
    /// queue drops it.
    pub fn dispatch(&self, event: NotificationEvent) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    event_type = %event.event_type,
                    workflow_id = %event.workflow_id,
                    "Notification queue full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    event_type = %event.event_type,
                    workflow_id = %event.workflow_id,
                    "Notification worker stopped, dropping event"
                );
                false
            }
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<NotificationEvent>, sink: Arc<dyn NotificationSink>) {
    while let Some(event) = receiver.recv().await {
        let event_type = event.event_type;
        let workflow_id = event.workflow_id.clone();

        if let Err(e) = sink.notify(event).await {
            warn!(
                event_type = %event_type,
                workflow_id = %workflow_id,
                error = %e,
                "Notification delivery failed"
            );
        }
    }
    debug!("Notification worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::domain::notification::{MockNotificationSink, NotificationEventType};
    use crate::domain::workflow::WorkflowId;
    use crate::domain::DomainError;

    fn event(event_type: NotificationEventType) -> NotificationEvent {
        NotificationEvent::new(
            event_type,
            WorkflowId::new("orders").unwrap(),
            json!({ "version": "1.0.0" }),
        )
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<NotificationEventType>>,
    }

    #[async_trait::async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: NotificationEvent) -> Result<(), DomainError> {
            self.events.lock().await.push(event.event_type);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, worker) = NotificationDispatcher::spawn(sink.clone(), 8);

        assert!(dispatcher.dispatch(event(NotificationEventType::VersionCreated)));
        assert!(dispatcher.dispatch(event(NotificationEventType::VersionActivated)));
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(
            *sink.events.lock().await,
            vec![
                NotificationEventType::VersionCreated,
                NotificationEventType::VersionActivated
            ]
        );
    }

    #[tokio::test]
    async fn test_sink_errors_do_not_stop_the_worker() {
        let mut sink = MockNotificationSink::new();
        sink.expect_notify()
            .times(2)
            .returning(|_| Err(DomainError::internal("smtp down")));
        let (dispatcher, worker) = NotificationDispatcher::spawn(Arc::new(sink), 8);

        dispatcher.dispatch(event(NotificationEventType::MigrationFailed));
        dispatcher.dispatch(event(NotificationEventType::RollbackPerformed));
        drop(dispatcher);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_queue_drops_events() {
        let (dispatcher, _receiver) = NotificationDispatcher::channel(1);

        assert!(dispatcher.dispatch(event(NotificationEventType::VersionCreated)));
        assert!(!dispatcher.dispatch(event(NotificationEventType::VersionActivated)));
    }

    #[test]
    fn test_disabled_dispatcher_discards() {
        let dispatcher = NotificationDispatcher::disabled();
        assert!(!dispatcher.is_enabled());
        assert!(!dispatcher.dispatch(event(NotificationEventType::VersionCreated)));
    }
}
