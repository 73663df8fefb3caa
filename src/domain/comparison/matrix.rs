//! Pairwise compatibility over a version history
//!
//! The matrix is a coarse proxy keyed on each version's declared change
//! type. It never re-diffs definitions; use the comparator for that.

use serde::{Deserialize, Serialize};

use super::difference::CompatibilityLevel;
use crate::domain::version::{ChangeType, VersionId, WorkflowVersion};

/// Compatibility of a pair of change types
pub fn pair_compatibility(a: ChangeType, b: ChangeType) -> CompatibilityLevel {
    match (a, b) {
        (ChangeType::Major, _) | (_, ChangeType::Major) => CompatibilityLevel::None,
        (ChangeType::Minor, _) | (_, ChangeType::Minor) => CompatibilityLevel::Partial,
        _ => CompatibilityLevel::Full,
    }
}

/// Symmetric `|V| x |V|` matrix indexed in history order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    pub version_ids: Vec<VersionId>,
    pub versions: Vec<String>,
    pub entries: Vec<Vec<CompatibilityLevel>>,
}

impl CompatibilityMatrix {
    pub fn from_versions(history: &[WorkflowVersion]) -> Self {
        let entries = history
            .iter()
            .enumerate()
            .map(|(i, row)| {
                history
                    .iter()
                    .enumerate()
                    .map(|(j, column)| {
                        if i == j {
                            CompatibilityLevel::Full
                        } else {
                            pair_compatibility(row.change_type(), column.change_type())
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            version_ids: history.iter().map(|v| v.id().clone()).collect(),
            versions: history.iter().map(|v| v.version().to_string()).collect(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Entry for two version numbers, if both are in the history
    pub fn get(&self, a: &str, b: &str) -> Option<CompatibilityLevel> {
        let i = self.versions.iter().position(|v| v == a)?;
        let j = self.versions.iter().position(|v| v == b)?;
        Some(self.entries[i][j])
    }
}
