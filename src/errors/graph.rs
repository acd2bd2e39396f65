// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use crate::graph::UnitId;

/// Adding an edge would make a unit (transitively) feed itself.
///
/// `path` lists the unit names along the cycle, starting and ending at the
/// upstream unit of the rejected edge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("connecting '{upstream}' -[{relationship}]-> '{downstream}' would create a cycle: {}", .path.join(" -> "))]
pub struct CycleError {
    pub upstream: String,
    pub downstream: String,
    pub relationship: String,
    pub path: Vec<String>,
}

/// A single structural problem found while assembling or freezing a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    /// A unit id that does not belong to this pipeline
    UnknownUnit { unit_id: UnitId },
    /// Sources take no input, so they cannot be the target of an edge
    SourceAsTarget { unit: String, unit_id: UnitId },
    /// An edge uses a relationship its source unit never declared
    UndeclaredRelationship {
        unit: String,
        unit_id: UnitId,
        relationship: String,
    },
    /// A non-terminal unit declares a relationship nobody consumes
    UnconsumedRelationship {
        unit: String,
        unit_id: UnitId,
        relationship: String,
    },
    /// No source feeds this unit, directly or transitively
    UnreachableUnit { unit: String, unit_id: UnitId },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::UnknownUnit { unit_id } => {
                write!(f, "unit {} does not belong to this pipeline", unit_id)
            }
            GraphIssue::SourceAsTarget { unit, unit_id } => {
                write!(f, "source '{}' ({}) cannot receive records", unit, unit_id)
            }
            GraphIssue::UndeclaredRelationship {
                unit,
                unit_id,
                relationship,
            } => write!(
                f,
                "unit '{}' ({}) does not declare relationship '{}'",
                unit, unit_id, relationship
            ),
            GraphIssue::UnconsumedRelationship {
                unit,
                unit_id,
                relationship,
            } => write!(
                f,
                "relationship '{}' of unit '{}' ({}) has no consumer; connect it or mark the unit terminal",
                relationship, unit, unit_id
            ),
            GraphIssue::UnreachableUnit { unit, unit_id } => {
                write!(f, "unit '{}' ({}) is not reachable from any source", unit, unit_id)
            }
        }
    }
}

/// Structural problems detected before any record flows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct GraphValidationError {
    pub issues: Vec<GraphIssue>,
}

impl GraphValidationError {
    pub fn single(issue: GraphIssue) -> Self {
        Self { issues: vec![issue] }
    }
}

impl fmt::Display for GraphValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pipeline graph ({} issue(s))", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_lists_path() {
        let err = CycleError {
            upstream: "c".into(),
            downstream: "a".into(),
            relationship: "success".into(),
            path: vec!["c".into(), "a".into(), "b".into(), "c".into()],
        };
        let text = err.to_string();
        assert!(text.contains("'c' -[success]-> 'a'"));
        assert!(text.ends_with("c -> a -> b -> c"));
    }

    #[test]
    fn test_validation_error_renders_every_issue() {
        let err = GraphValidationError {
            issues: vec![
                GraphIssue::UnreachableUnit {
                    unit: "orphan".into(),
                    unit_id: UnitId::new(3),
                },
                GraphIssue::UnconsumedRelationship {
                    unit: "add".into(),
                    unit_id: UnitId::new(1),
                    relationship: "failure".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("invalid pipeline graph (2 issue(s))"));
        assert!(text.contains("'orphan' (#3) is not reachable"));
        assert!(text.contains("relationship 'failure' of unit 'add' (#1)"));
    }
}
