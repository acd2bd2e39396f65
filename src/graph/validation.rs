// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Freeze-time validation for pipeline graphs.
//!
//! Cycles are already impossible by the time a graph is frozen (every
//! `connect` checks reachability), so freezing only verifies the remaining
//! structural invariants:
//!
//! 1. **Declared relationships**: every edge uses a relationship its source unit declares
//! 2. **Consumers**: every relationship a non-terminal unit declares has at least one edge
//! 3. **Reachability**: every unit is fed, directly or transitively, by a source
//!
//! All three checks run and their issues are accumulated, so callers see every
//! problem at once rather than fixing them one by one. Issues are reported in
//! unit-id order.

use std::collections::{HashSet, VecDeque};

use crate::errors::{GraphIssue, GraphValidationError};
use crate::graph::pipeline_graph::PipelineGraph;
use crate::graph::record::Payload;
use crate::graph::unit::Arity;
use crate::observability::messages::graph::GraphValidationFailed;
use crate::observability::messages::StructuredLog;

/// Validates a graph's structural invariants before it is run.
pub fn validate_graph<T: Payload>(graph: &PipelineGraph<T>) -> Result<(), GraphValidationError> {
    let mut issues = Vec::new();

    issues.extend(validate_declared_relationships(graph));
    issues.extend(validate_consumed_relationships(graph));
    issues.extend(validate_reachability(graph));

    if issues.is_empty() {
        Ok(())
    } else {
        let error = GraphValidationError { issues };
        GraphValidationFailed { error: &error }.log();
        Err(error)
    }
}

fn validate_declared_relationships<T: Payload>(graph: &PipelineGraph<T>) -> Vec<GraphIssue> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();

    for edge in graph.edges() {
        let Some(unit) = graph.unit(edge.from) else {
            issues.push(GraphIssue::UnknownUnit { unit_id: edge.from });
            continue;
        };
        if !unit.declares(&edge.relationship) && seen.insert((edge.from, &edge.relationship)) {
            issues.push(GraphIssue::UndeclaredRelationship {
                unit: unit.name().to_string(),
                unit_id: unit.id(),
                relationship: edge.relationship.clone(),
            });
        }
    }

    issues
}

fn validate_consumed_relationships<T: Payload>(graph: &PipelineGraph<T>) -> Vec<GraphIssue> {
    let consumed: HashSet<_> = graph
        .edges()
        .iter()
        .map(|edge| (edge.from, edge.relationship.as_str()))
        .collect();

    graph
        .units()
        .filter(|unit| !unit.is_terminal())
        .flat_map(|unit| {
            unit.emits()
                .filter(|relationship| !consumed.contains(&(unit.id(), *relationship)))
                .map(|relationship| GraphIssue::UnconsumedRelationship {
                    unit: unit.name().to_string(),
                    unit_id: unit.id(),
                    relationship: relationship.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn validate_reachability<T: Payload>(graph: &PipelineGraph<T>) -> Vec<GraphIssue> {
    let mut reached = vec![false; graph.len()];
    let mut queue: VecDeque<_> = graph.sources().map(|unit| unit.id()).collect();
    for id in &queue {
        reached[id.index()] = true;
    }

    while let Some(current) = queue.pop_front() {
        for &next in graph.successors(current) {
            if !reached[next.index()] {
                reached[next.index()] = true;
                queue.push_back(next);
            }
        }
    }

    graph
        .units()
        .filter(|unit| unit.arity() == Arity::Transform && !reached[unit.id().index()])
        .map(|unit| GraphIssue::UnreachableUnit {
            unit: unit.name().to_string(),
            unit_id: unit.id(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::DEFAULT_RELATIONSHIP;
    use crate::graph::unit::Processor;

    fn source(name: &str) -> Processor<i64> {
        Processor::source(name, || vec![("success", 1i64)])
    }

    fn transform(name: &str) -> Processor<i64> {
        Processor::transform(name, |x: i64| [("success", x)])
    }

    fn sink(name: &str) -> Processor<i64> {
        Processor::sink(name, |_x: i64| {})
    }

    #[test]
    fn test_valid_graph() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(source("src"));
        let add = graph.add(transform("add").emits("failure"));
        let ok = graph.add(sink("ok"));
        let failed = graph.add(sink("failed"));
        graph.connect(src, DEFAULT_RELATIONSHIP, add).unwrap();
        graph.connect(add, DEFAULT_RELATIONSHIP, ok).unwrap();
        graph.connect(add, "failure", failed).unwrap();

        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn test_empty_graph_is_valid() {
        let graph: PipelineGraph<i64> = PipelineGraph::new();
        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn test_undeclared_relationship() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(source("src"));
        let out = graph.add(sink("out"));
        graph.connect(src, DEFAULT_RELATIONSHIP, out).unwrap();
        graph.connect(src, "typo", out).unwrap();

        let errors = validate_graph(&graph).unwrap_err();
        assert_eq!(errors.issues.len(), 1);
        assert!(matches!(
            &errors.issues[0],
            GraphIssue::UndeclaredRelationship { relationship, .. } if relationship == "typo"
        ));
    }

    #[test]
    fn test_unconsumed_relationship() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(source("src"));
        let add = graph.add(transform("add").emits("failure"));
        let out = graph.add(sink("out"));
        graph.connect(src, DEFAULT_RELATIONSHIP, add).unwrap();
        graph.connect(add, DEFAULT_RELATIONSHIP, out).unwrap();

        let errors = validate_graph(&graph).unwrap_err();
        assert_eq!(
            errors.issues,
            vec![GraphIssue::UnconsumedRelationship {
                unit: "add".into(),
                unit_id: add,
                relationship: "failure".into(),
            }]
        );
    }

    #[test]
    fn test_terminal_unit_may_leave_relationships_open() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(source("src"));
        let last = graph.add(transform("last").terminal());
        graph.connect(src, DEFAULT_RELATIONSHIP, last).unwrap();

        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn test_unreachable_unit() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(source("src"));
        let out = graph.add(sink("out"));
        let orphan = graph.add(sink("orphan"));
        graph.connect(src, DEFAULT_RELATIONSHIP, out).unwrap();

        let errors = validate_graph(&graph).unwrap_err();
        assert_eq!(
            errors.issues,
            vec![GraphIssue::UnreachableUnit {
                unit: "orphan".into(),
                unit_id: orphan,
            }]
        );
    }

    #[test]
    fn test_issues_are_accumulated() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(source("src"));
        let _dangling = graph.add(transform("dangling"));

        let errors = validate_graph(&graph).unwrap_err();
        // src.success and dangling.success have no consumer, dangling is unreachable
        assert_eq!(errors.issues.len(), 3);
        assert!(errors.issues.iter().any(|issue| matches!(
            issue,
            GraphIssue::UnconsumedRelationship { unit_id, .. } if *unit_id == src
        )));
    }
}
