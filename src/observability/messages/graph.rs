// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph assembly and freezing.
//!
//! This module contains message types for logging events related to:
//! * Edges added through the chaining operations
//! * Edges rejected because they would close a cycle
//! * Freeze-time validation results

use crate::errors::{CycleError, GraphValidationError};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// An edge was added to the graph.
///
/// # Log Level
/// `debug!` - Assembly detail
///
/// # Example
/// ```
/// use the_pipeworks::observability::messages::graph::EdgeConnected;
///
/// let msg = EdgeConnected {
///     upstream: "add",
///     relationship: "failure",
///     downstream: "log_error",
/// };
///
/// assert_eq!(msg.to_string(), "Connected 'add' -[failure]-> 'log_error'");
/// ```
pub struct EdgeConnected<'a> {
    pub upstream: &'a str,
    pub relationship: &'a str,
    pub downstream: &'a str,
}

impl Display for EdgeConnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Connected '{}' -[{}]-> '{}'",
            self.upstream, self.relationship, self.downstream
        )
    }
}

impl StructuredLog for EdgeConnected<'_> {
    fn log(&self) {
        tracing::debug!(
            upstream = self.upstream,
            relationship = self.relationship,
            downstream = self.downstream,
            "{}", self
        );
    }
}

/// An edge was rejected because it would close a cycle.
///
/// # Log Level
/// `warn!` - The caller's graph is left unchanged, but the caller asked for
/// something impossible
pub struct CycleRejected<'a> {
    pub error: &'a CycleError,
}

impl Display for CycleRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rejected edge: {}", self.error)
    }
}

impl StructuredLog for CycleRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            upstream = %self.error.upstream,
            downstream = %self.error.downstream,
            relationship = %self.error.relationship,
            cycle = self.error.path.join(" -> "),
            "{}", self
        );
    }
}

/// The graph passed validation and was split into units and routing table.
///
/// # Log Level
/// `debug!` - Assembly detail
pub struct GraphFrozen {
    pub unit_count: usize,
    pub source_count: usize,
    pub edge_count: usize,
}

impl Display for GraphFrozen {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Froze pipeline graph: {} units ({} sources), {} edges",
            self.unit_count, self.source_count, self.edge_count
        )
    }
}

impl StructuredLog for GraphFrozen {
    fn log(&self) {
        tracing::debug!(
            unit_count = self.unit_count,
            source_count = self.source_count,
            edge_count = self.edge_count,
            "{}", self
        );
    }
}

/// Freeze-time validation found structural problems.
///
/// # Log Level
/// `error!` - The run will not start
pub struct GraphValidationFailed<'a> {
    pub error: &'a GraphValidationError,
}

impl Display for GraphValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl StructuredLog for GraphValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(issue_count = self.error.issues.len(), "{}", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_rejected_display() {
        let error = CycleError {
            upstream: "b".into(),
            downstream: "a".into(),
            relationship: "success".into(),
            path: vec!["b".into(), "a".into(), "b".into()],
        };
        let msg = CycleRejected { error: &error };
        assert_eq!(
            msg.to_string(),
            "Rejected edge: connecting 'b' -[success]-> 'a' would create a cycle: b -> a -> b"
        );
    }

    #[test]
    fn test_graph_frozen_display() {
        let msg = GraphFrozen {
            unit_count: 5,
            source_count: 2,
            edge_count: 6,
        };
        assert_eq!(
            msg.to_string(),
            "Froze pipeline graph: 5 units (2 sources), 6 edges"
        );
    }
}
