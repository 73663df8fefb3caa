//! Transactional persistence boundary

mod transaction;

pub use transaction::{Transaction, UnitOfWork};

#[cfg(test)]
pub use transaction::MockUnitOfWork;
