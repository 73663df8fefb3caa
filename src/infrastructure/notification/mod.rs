//! Notification delivery

mod dispatcher;
mod tracing_sink;

pub use dispatcher::NotificationDispatcher;
pub use tracing_sink::TracingNotificationSink;
