//! Workflow version domain module

mod entity;
mod numbering;
pub mod repository;

pub use entity::{ChangeType, VersionChanges, VersionId, WorkflowVersion};
pub use numbering::{compare_versions, next_version, parse_version, INITIAL_VERSION};
pub use repository::VersionRepository;
