//! Structural comparison of workflow definitions

use std::collections::HashSet;

use super::difference::{
    CompatibilityLevel, ComparisonSummary, DifferenceKind, DifferenceType, ImpactLevel,
    SchemaSide, VersionDifference,
};
use crate::domain::workflow::{Schema, WorkflowDefinition};

/// Compute the differences that turn `from` into `to`.
///
/// Output order is deterministic: metadata, step count, removed steps (in `from`
/// order), added/changed/moved steps (in `to` order), then input and output
/// schema fields in key order.
pub fn compare_definitions(from: &WorkflowDefinition, to: &WorkflowDefinition) -> Vec<VersionDifference> {
    let mut kinds = Vec::new();

    if from.name != to.name {
        kinds.push(DifferenceKind::NameChanged {
            from: from.name.clone(),
            to: to.name.clone(),
        });
    }

    if from.description != to.description {
        kinds.push(DifferenceKind::DescriptionChanged);
    }

    if from.step_count() != to.step_count() {
        kinds.push(DifferenceKind::StepCountChanged {
            from: from.step_count(),
            to: to.step_count(),
        });
    }

    compare_steps(from, to, &mut kinds);
    compare_schema(SchemaSide::Input, &from.input_schema, &to.input_schema, &mut kinds);
    compare_schema(SchemaSide::Output, &from.output_schema, &to.output_schema, &mut kinds);

    kinds.into_iter().map(VersionDifference::new).collect()
}

fn compare_steps(from: &WorkflowDefinition, to: &WorkflowDefinition, kinds: &mut Vec<DifferenceKind>) {
    let to_names: HashSet<&str> = to.steps.iter().map(|s| s.name.as_str()).collect();
    let from_names: HashSet<&str> = from.steps.iter().map(|s| s.name.as_str()).collect();

    for step in &from.steps {
        if !to_names.contains(step.name.as_str()) {
            kinds.push(DifferenceKind::StepRemoved {
                step: step.name.clone(),
            });
        }
    }

    // Positions among the steps both sides share, so that inserting or
    // removing a step does not flag every later step as moved.
    let shared_from: Vec<&str> = from
        .steps
        .iter()
        .map(|s| s.name.as_str())
        .filter(|n| to_names.contains(n))
        .collect();
    let shared_to: Vec<&str> = to
        .steps
        .iter()
        .map(|s| s.name.as_str())
        .filter(|n| from_names.contains(n))
        .collect();

    for step in &to.steps {
        let Some(old) = from.step(&step.name) else {
            kinds.push(DifferenceKind::StepAdded {
                step: step.name.clone(),
            });
            continue;
        };

        if old.kind.type_name() != step.kind.type_name() {
            kinds.push(DifferenceKind::StepTypeChanged {
                step: step.name.clone(),
                from: old.kind.type_name().to_string(),
                to: step.kind.type_name().to_string(),
            });
        } else if old.kind != step.kind {
            kinds.push(DifferenceKind::StepModified {
                step: step.name.clone(),
            });
        }

        let old_pos = shared_from.iter().position(|n| *n == step.name);
        let new_pos = shared_to.iter().position(|n| *n == step.name);

        if let (Some(old_pos), Some(new_pos)) = (old_pos, new_pos) {
            if old_pos != new_pos {
                kinds.push(DifferenceKind::StepMoved {
                    step: step.name.clone(),
                    from: old_pos,
                    to: new_pos,
                });
            }
        }
    }
}

fn compare_schema(side: SchemaSide, from: &Schema, to: &Schema, kinds: &mut Vec<DifferenceKind>) {
    let mut names: Vec<&String> = from.keys().chain(to.keys()).collect();
    names.sort();
    names.dedup();

    for name in names {
        match (from.get(name), to.get(name)) {
            (Some(old), None) => kinds.push(DifferenceKind::FieldRemoved {
                schema: side,
                field: name.clone(),
                field_type: old.field_type,
            }),
            (None, Some(new)) => kinds.push(DifferenceKind::FieldAdded {
                schema: side,
                field: name.clone(),
                field_type: new.field_type,
            }),
            (Some(old), Some(new)) => {
                if old.field_type != new.field_type {
                    kinds.push(DifferenceKind::FieldTypeChanged {
                        schema: side,
                        field: name.clone(),
                        from: old.field_type,
                        to: new.field_type,
                    });
                }

                if old.required != new.required {
                    kinds.push(DifferenceKind::FieldRequirementChanged {
                        schema: side,
                        field: name.clone(),
                        required: new.required,
                    });
                }
            }
            (None, None) => {}
        }
    }
}

/// Aggregate differences by type and impact and derive compatibility
pub fn summarize_comparison(differences: &[VersionDifference]) -> ComparisonSummary {
    let mut summary = ComparisonSummary {
        total: differences.len(),
        ..Default::default()
    };

    for diff in differences {
        match diff.difference_type {
            DifferenceType::Added => summary.added += 1,
            DifferenceType::Removed => summary.removed += 1,
            DifferenceType::Modified => summary.modified += 1,
            DifferenceType::Moved => summary.moved += 1,
        }

        match diff.impact {
            ImpactLevel::Low => summary.low_impact += 1,
            ImpactLevel::Medium => summary.medium_impact += 1,
            ImpactLevel::High => summary.high_impact += 1,
            ImpactLevel::Critical => summary.critical_impact += 1,
        }
    }

    summary.has_breaking_changes = summary.high_impact + summary.critical_impact > 0;
    summary.compatibility = if summary.has_breaking_changes {
        CompatibilityLevel::None
    } else if summary.medium_impact > 0 {
        CompatibilityLevel::Partial
    } else {
        CompatibilityLevel::Full
    };

    summary
}
