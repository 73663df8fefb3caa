//! Infrastructure services

mod version_manager;
mod version_service;

pub use version_manager::{Activation, VersionManager, VersionStores};
pub use version_service::{VersionMetrics, VersionService};
