//! Observability infrastructure

pub mod metrics;

pub use self::metrics::{record_migration, record_rollback, record_version_activated, record_version_created};
