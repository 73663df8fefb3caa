//! Definition comparison module
//!
//! Differences are classified by type and by impact through a fixed policy
//! table (see [`DifferenceKind::impact`]); compatibility is derived from the
//! highest impact present.

mod comparator;
mod difference;
mod matrix;

pub use comparator::{compare_definitions, summarize_comparison};
pub use difference::{
    CompatibilityLevel, ComparisonSummary, DifferenceKind, DifferenceType, ImpactLevel,
    SchemaSide, VersionComparison, VersionDifference,
};
pub use matrix::{pair_compatibility, CompatibilityMatrix};
