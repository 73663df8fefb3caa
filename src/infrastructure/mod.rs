//! Infrastructure layer - Adapters, migration runtime and services

pub mod logging;
pub mod migration;
pub mod notification;
pub mod observability;
pub mod services;
pub mod storage;
