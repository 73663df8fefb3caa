//! Validation module
//!
//! Checks run before any state is mutated: definitions, version changes
//! against the previous definition, rollbacks and migration plans.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationContext, Validator, ValidatorConfig};
