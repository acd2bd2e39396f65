// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Relationship-based routing.
//!
//! The registry is the frozen form of a graph's edges: a lookup from
//! `(upstream unit, relationship name)` to the downstream units subscribed to
//! it, in the order they were connected. Routing a record hands one copy of its
//! payload to every subscriber; the last subscriber receives the original.

use std::collections::HashMap;

use crate::graph::pipeline_graph::Edge;
use crate::graph::record::{Payload, Record};
use crate::graph::unit::UnitId;

/// Result of routing one record.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteOutcome<T> {
    /// The payload was handed to this many targets
    Delivered(usize),
    /// No edge matches; the record is handed back untouched
    Unrouted(Record<T>),
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    routes: HashMap<UnitId, HashMap<String, Vec<UnitId>>>,
    edge_count: usize,
}

impl RelationshipRegistry {
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut registry = Self::default();
        for edge in edges {
            registry
                .routes
                .entry(edge.from)
                .or_default()
                .entry(edge.relationship.clone())
                .or_default()
                .push(edge.to);
            registry.edge_count += 1;
        }
        registry
    }

    /// Subscribers of `(from, relationship)`, empty if there are none.
    pub fn targets(&self, from: UnitId, relationship: &str) -> &[UnitId] {
        self.routes
            .get(&from)
            .and_then(|by_name| by_name.get(relationship))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_routed(&self, from: UnitId, relationship: &str) -> bool {
        !self.targets(from, relationship).is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Every `(from, to)` pair with at least one edge, relationship names ignored.
    pub fn links(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.routes.iter().flat_map(|(from, by_name)| {
            by_name
                .values()
                .flatten()
                .map(move |to| (*from, *to))
        })
    }

    /// Hand `record`'s payload to every subscriber through `enqueue`.
    pub fn route<T: Payload>(
        &self,
        from: UnitId,
        record: Record<T>,
        mut enqueue: impl FnMut(UnitId, T),
    ) -> RouteOutcome<T> {
        let targets = self.targets(from, &record.relationship);
        match targets.split_last() {
            None => RouteOutcome::Unrouted(record),
            Some((last, rest)) => {
                for &target in rest {
                    enqueue(target, record.payload.clone());
                }
                enqueue(*last, record.payload);
                RouteOutcome::Delivered(targets.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: usize, relationship: &str, to: usize) -> Edge {
        Edge {
            from: UnitId::new(from),
            relationship: relationship.to_string(),
            to: UnitId::new(to),
        }
    }

    #[test]
    fn test_fan_out_delivers_equal_copies_in_connect_order() {
        let registry = RelationshipRegistry::from_edges(&[
            edge(0, "success", 3),
            edge(0, "success", 1),
            edge(0, "success", 2),
        ]);

        let mut delivered = Vec::new();
        let outcome = registry.route(UnitId::new(0), Record::success(vec![7u8]), |to, p| {
            delivered.push((to, p))
        });

        assert_eq!(outcome, RouteOutcome::Delivered(3));
        assert_eq!(
            delivered,
            vec![
                (UnitId::new(3), vec![7u8]),
                (UnitId::new(1), vec![7u8]),
                (UnitId::new(2), vec![7u8]),
            ]
        );
    }

    #[test]
    fn test_relationships_are_keyed_per_unit() {
        let registry =
            RelationshipRegistry::from_edges(&[edge(0, "failure", 1), edge(2, "success", 1)]);

        assert!(registry.is_routed(UnitId::new(0), "failure"));
        assert!(!registry.is_routed(UnitId::new(0), "success"));
        assert!(!registry.is_routed(UnitId::new(2), "failure"));
        assert_eq!(registry.edge_count(), 2);
    }

    #[test]
    fn test_unmatched_relationship_returns_record() {
        let registry = RelationshipRegistry::from_edges(&[edge(0, "success", 1)]);

        let outcome = registry.route(UnitId::new(0), Record::new("failure", 5), |_, _: i32| {
            panic!("nothing should be enqueued")
        });

        assert_eq!(outcome, RouteOutcome::Unrouted(Record::new("failure", 5)));
    }
}
