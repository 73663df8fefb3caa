//! Migration execution: handlers, registry, executor and the migrator

mod executor;
mod handlers;
mod migrator;
mod registry;

pub use executor::MigrationExecutor;
pub use handlers::{DefinitionActionHandler, BUILTIN_ACTIONS};
pub use migrator::Migrator;
pub use registry::HandlerRegistry;
