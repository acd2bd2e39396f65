// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The frozen, runnable form of a pipeline.
//!
//! An [`ExecutionPlan`] owns every unit of a frozen graph plus the shared
//! routing table. The concurrent executor splits a plan into one sub-plan per
//! weakly connected component; units never move between components, so a
//! fan-in unit is only ever driven by the single worker that owns it.

use std::sync::Arc;

use crate::config::{EngineConfig, RoutingMode};
use crate::errors::GraphValidationError;
use crate::graph::{Arity, Payload, PipelineGraph, ProcessingUnit, RelationshipRegistry, UnitId};

/// Knobs the executors read while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub routing: RoutingMode,
    /// Yield to the runtime after this many steps
    pub yield_interval: usize,
}

impl From<&EngineConfig> for RunSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            routing: config.routing,
            yield_interval: config.options.yield_interval().max(1),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Units addressed by id. A sub-plan keeps the original ids, with the slots
/// of other components left empty.
pub struct UnitTable<T: Payload> {
    slots: Vec<Option<ProcessingUnit<T>>>,
}

impl<T: Payload> UnitTable<T> {
    pub fn new(units: Vec<ProcessingUnit<T>>) -> Self {
        let mut slots: Vec<Option<ProcessingUnit<T>>> = Vec::with_capacity(units.len());
        for unit in units {
            let index = unit.id().index();
            if slots.len() <= index {
                slots.resize_with(index + 1, || None);
            }
            slots[index] = Some(unit);
        }
        Self { slots }
    }

    pub fn get(&self, id: UnitId) -> Option<&ProcessingUnit<T>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut ProcessingUnit<T>> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Ids of the units present, ascending.
    pub fn ids(&self) -> Vec<UnitId> {
        self.iter().map(ProcessingUnit::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessingUnit<T>> {
        self.slots.iter().flatten()
    }

    pub fn source_ids(&self) -> Vec<UnitId> {
        self.iter()
            .filter(|unit| unit.arity() == Arity::Source)
            .map(ProcessingUnit::id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the id space, including empty slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn take(&mut self, id: UnitId) -> Option<ProcessingUnit<T>> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }
}

/// Everything an executor needs for one run.
pub struct ExecutionPlan<T: Payload> {
    pub units: UnitTable<T>,
    pub registry: Arc<RelationshipRegistry>,
    pub settings: RunSettings,
}

impl<T: Payload> ExecutionPlan<T> {
    /// Validate and freeze `graph` into a plan.
    pub fn freeze(graph: PipelineGraph<T>, settings: RunSettings) -> Result<Self, GraphValidationError> {
        Self::try_freeze(graph, settings).map_err(|(_, error)| error)
    }

    /// Validate and freeze `graph`, returning it unchanged if validation fails.
    pub fn try_freeze(
        graph: PipelineGraph<T>,
        settings: RunSettings,
    ) -> Result<Self, (PipelineGraph<T>, GraphValidationError)> {
        let (units, registry) = graph.try_freeze()?;
        Ok(Self {
            units: UnitTable::new(units),
            registry: Arc::new(registry),
            settings,
        })
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn source_count(&self) -> usize {
        self.units.source_ids().len()
    }

    /// Split into one plan per weakly connected component, ordered by each
    /// component's lowest unit id.
    pub fn partition(mut self) -> Vec<ExecutionPlan<T>> {
        let capacity = self.units.capacity();
        let mut components = DisjointSet::new(capacity);
        for (from, to) in self.registry.links() {
            components.union(from.index(), to.index());
        }

        let mut groups: Vec<(usize, Vec<ProcessingUnit<T>>)> = Vec::new();
        for id in self.units.ids() {
            let root = components.find(id.index());
            let Some(unit) = self.units.take(id) else {
                continue;
            };
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, members)) => members.push(unit),
                None => groups.push((root, vec![unit])),
            }
        }

        groups
            .into_iter()
            .map(|(_, members)| ExecutionPlan {
                units: UnitTable::new(members),
                registry: Arc::clone(&self.registry),
                settings: self.settings,
            })
            .collect()
    }
}

/// Union-find over dense indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            self.parent[index] = self.parent[self.parent[index]];
            index = self.parent[index];
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            self.parent[root_b.max(root_a)] = root_a.min(root_b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Processor, DEFAULT_RELATIONSHIP};

    fn source(name: &str) -> Processor<i64> {
        Processor::source(name, || vec![("success", 1i64)])
    }

    fn sink(name: &str) -> Processor<i64> {
        Processor::sink(name, |_x: i64| {})
    }

    #[test]
    fn test_partition_splits_independent_chains() {
        let mut graph = PipelineGraph::new();
        let a = graph.add(source("a"));
        let b = graph.add(source("b"));
        let a_out = graph.add(sink("a_out"));
        let b_out = graph.add(sink("b_out"));
        graph.connect(a, DEFAULT_RELATIONSHIP, a_out).unwrap();
        graph.connect(b, DEFAULT_RELATIONSHIP, b_out).unwrap();

        let plan = ExecutionPlan::freeze(graph, RunSettings::default()).unwrap();
        let parts = plan.partition();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].units.ids(), vec![a, a_out]);
        assert_eq!(parts[1].units.ids(), vec![b, b_out]);
        assert_eq!(parts[1].units.capacity(), 4);
    }

    #[test]
    fn test_fan_in_keeps_sources_together() {
        let mut graph = PipelineGraph::new();
        let a = graph.add(source("a"));
        let b = graph.add(source("b"));
        let join = graph.add(sink("join"));
        graph.connect(a, DEFAULT_RELATIONSHIP, join).unwrap();
        graph.connect(b, DEFAULT_RELATIONSHIP, join).unwrap();

        let plan = ExecutionPlan::freeze(graph, RunSettings::default()).unwrap();
        let parts = plan.partition();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].units.ids(), vec![a, b, join]);
        assert_eq!(parts[0].source_count(), 2);
    }

    #[test]
    fn test_settings_follow_config() {
        let config = EngineConfig {
            routing: RoutingMode::Strict,
            ..EngineConfig::default()
        };
        let settings = RunSettings::from(&config);
        assert_eq!(settings.routing, RoutingMode::Strict);
        assert_eq!(settings.yield_interval, 64);
    }
}
