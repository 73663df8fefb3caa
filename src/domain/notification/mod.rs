//! Notification domain

mod event;
mod sink;

pub use event::{NotificationEvent, NotificationEventType};
pub use sink::NotificationSink;

#[cfg(test)]
pub use sink::MockNotificationSink;
