//! Storage infrastructure - In-memory persistence adapter

mod execution_tracker;
mod in_memory;

pub use execution_tracker::InMemoryExecutionTracker;
pub use in_memory::InMemoryStore;
