// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The composition structure built by chaining processing units together.
//!
//! The graph is kept acyclic incrementally: every [`PipelineGraph::connect`]
//! runs a breadth-first reachability search from the downstream unit, and
//! rejects the edge if it can reach the upstream unit. A rejected edge leaves
//! the graph untouched.
//!
//! ```text
//!   numbers ──success──▶ add ──success──▶ print
//!                         │
//!                         └──failure──▶ log_error
//! ```
//!
//! Whole-graph checks (declared relationships, consumers, reachability) are
//! deferred to [`PipelineGraph::freeze`], see [`crate::graph::validation`].

use std::collections::{HashMap, VecDeque};

use crate::errors::{CycleError, GraphIssue, GraphValidationError, PipelineError};
use crate::graph::record::Payload;
use crate::graph::registry::RelationshipRegistry;
use crate::graph::unit::{Arity, ProcessingUnit, Processor, UnitId};
use crate::graph::validation::validate_graph;
use crate::observability::messages::graph::{CycleRejected, EdgeConnected, GraphFrozen};
use crate::observability::messages::StructuredLog;

/// A directed binding from `(from, relationship)` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: UnitId,
    pub relationship: String,
    pub to: UnitId,
}

/// Units plus the edges between them.
pub struct PipelineGraph<T: Payload> {
    units: Vec<ProcessingUnit<T>>,
    edges: Vec<Edge>,
    successors: Vec<Vec<UnitId>>,
}

impl<T: Payload> Default for PipelineGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload> PipelineGraph<T> {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            edges: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Take ownership of a processor and assign it the next id.
    pub fn add(&mut self, processor: Processor<T>) -> UnitId {
        let id = UnitId::new(self.units.len());
        self.units.push(processor.into_unit(id));
        self.successors.push(Vec::new());
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&ProcessingUnit<T>> {
        self.units.get(id.index())
    }

    pub fn units(&self) -> impl Iterator<Item = &ProcessingUnit<T>> {
        self.units.iter()
    }

    pub fn sources(&self) -> impl Iterator<Item = &ProcessingUnit<T>> {
        self.units.iter().filter(|u| u.arity() == Arity::Source)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Units directly fed by `id`, over any relationship.
    pub fn successors(&self, id: UnitId) -> &[UnitId] {
        self.successors
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn lookup(&self, id: UnitId) -> Result<&ProcessingUnit<T>, GraphValidationError> {
        self.unit(id)
            .ok_or_else(|| GraphValidationError::single(GraphIssue::UnknownUnit { unit_id: id }))
    }

    /// Add an edge `(from, relationship) -> to`.
    ///
    /// Fails without modifying the graph if either id is unknown, if `to` is a
    /// source, or if the edge would close a cycle. Connecting an existing edge
    /// again is a no-op.
    pub fn connect(
        &mut self,
        from: UnitId,
        relationship: &str,
        to: UnitId,
    ) -> Result<(), PipelineError> {
        let upstream = self.lookup(from)?;
        let downstream = self.lookup(to)?;

        if downstream.arity() == Arity::Source {
            return Err(GraphValidationError::single(GraphIssue::SourceAsTarget {
                unit: downstream.name().to_string(),
                unit_id: to,
            })
            .into());
        }

        if let Some(path) = self.path_between(to, from) {
            let mut names = vec![upstream.name().to_string()];
            names.extend(path.iter().map(|id| self.units[id.index()].name().to_string()));

            let error = CycleError {
                upstream: upstream.name().to_string(),
                downstream: downstream.name().to_string(),
                relationship: relationship.to_string(),
                path: names,
            };
            CycleRejected { error: &error }.log();
            return Err(error.into());
        }

        let edge = Edge {
            from,
            relationship: relationship.to_string(),
            to,
        };
        if self.edges.contains(&edge) {
            return Ok(());
        }

        EdgeConnected {
            upstream: upstream.name(),
            relationship,
            downstream: downstream.name(),
        }
        .log();

        self.edges.push(edge);
        let successors = &mut self.successors[from.index()];
        if !successors.contains(&to) {
            successors.push(to);
        }
        Ok(())
    }

    /// Breadth-first search for a path `start -> ... -> goal`, both ends included.
    fn path_between(&self, start: UnitId, goal: UnitId) -> Option<Vec<UnitId>> {
        let mut parents: HashMap<UnitId, UnitId> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut seen = vec![false; self.units.len()];
        seen[start.index()] = true;

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&parent) = parents.get(&cursor) {
                    path.push(parent);
                    cursor = parent;
                }
                path.reverse();
                return Some(path);
            }
            for &next in self.successors(current) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Validate the whole graph and split it into its units and routing table.
    pub fn freeze(
        self,
    ) -> Result<(Vec<ProcessingUnit<T>>, RelationshipRegistry), GraphValidationError> {
        self.try_freeze().map_err(|(_, error)| error)
    }

    /// Like [`freeze`](Self::freeze), but hands the graph back untouched when
    /// validation fails.
    pub fn try_freeze(
        self,
    ) -> Result<(Vec<ProcessingUnit<T>>, RelationshipRegistry), (Self, GraphValidationError)> {
        if let Err(error) = validate_graph(&self) {
            return Err((self, error));
        }

        let registry = RelationshipRegistry::from_edges(&self.edges);
        GraphFrozen {
            unit_count: self.units.len(),
            source_count: self.sources().count(),
            edge_count: self.edges.len(),
        }
        .log();

        Ok((self.units, registry))
    }
}
