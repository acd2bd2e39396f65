// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run lifecycle and routing events.
//!
//! This module contains message types for logging events related to:
//! * Run start and its three terminal phases (drained, cancelled, failed)
//! * Source exhaustion
//! * Records dropped by lenient routing
//! * Component partitioning in concurrent mode

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_pipeworks::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted {
///     strategy: "sequential",
///     unit_count: 5,
///     source_count: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub strategy: &'a str,
    pub unit_count: usize,
    pub source_count: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting pipeline run with {} executor: {} units, {} sources",
            self.strategy, self.unit_count, self.source_count
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            unit_count = self.unit_count,
            source_count = self.source_count,
            "{}", self
        );
    }
}

impl RunStarted<'_> {
    /// Span covering one whole run; executors instrument their work with it.
    pub fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            strategy = self.strategy,
            unit_count = self.unit_count,
            source_count = self.source_count,
        )
    }
}

/// Every source is exhausted and the work queue is empty.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_pipeworks::observability::messages::engine::RunDrained;
/// use std::time::Duration;
///
/// let msg = RunDrained {
///     strategy: "sequential",
///     steps: 42,
///     elapsed: Duration::from_millis(3),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunDrained<'a> {
    pub strategy: &'a str,
    pub steps: u64,
    pub elapsed: Duration,
}

impl Display for RunDrained<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline drained with {} executor after {} steps in {:?}",
            self.strategy, self.steps, self.elapsed
        )
    }
}

impl StructuredLog for RunDrained<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            steps = self.steps,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }
}

/// The run observed its cancel signal and stopped at a step boundary.
///
/// # Log Level
/// `info!` - Cancellation is the normal way unbound pipelines end
pub struct RunCancelled<'a> {
    pub strategy: &'a str,
    pub steps: u64,
    /// Records still queued when the run stopped; they are discarded
    pub in_flight: usize,
    pub elapsed: Duration,
}

impl Display for RunCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline cancelled with {} executor after {} steps in {:?}, {} records in flight discarded",
            self.strategy, self.steps, self.elapsed, self.in_flight
        )
    }
}

impl StructuredLog for RunCancelled<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            steps = self.steps,
            in_flight = self.in_flight,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }
}

/// The run failed; teardown has already completed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_pipeworks::observability::messages::engine::RunFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
/// let msg = RunFailed {
///     strategy: "sequential",
///     error: &error,
/// };
///
/// assert_eq!(msg.to_string(), "Pipeline run failed with sequential executor: boom");
/// ```
pub struct RunFailed<'a> {
    pub strategy: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline run failed with {} executor: {}",
            self.strategy, self.error
        )
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            strategy = self.strategy,
            error = %self.error,
            "{}", self
        );
    }
}

/// A source's sequence ended and the source was retired.
///
/// # Log Level
/// `debug!`
pub struct SourceExhausted<'a> {
    pub unit: &'a str,
    pub records_pulled: u64,
}

impl Display for SourceExhausted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source '{}' exhausted after {} records",
            self.unit, self.records_pulled
        )
    }
}

impl StructuredLog for SourceExhausted<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            records_pulled = self.records_pulled,
            "{}", self
        );
    }
}

/// Lenient routing dropped a record nobody subscribed to.
///
/// # Log Level
/// `debug!`
pub struct RecordDropped<'a> {
    pub unit: &'a str,
    pub relationship: &'a str,
}

impl Display for RecordDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropped record from '{}' on unrouted relationship '{}'",
            self.unit, self.relationship
        )
    }
}

impl StructuredLog for RecordDropped<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            relationship = self.relationship,
            "{}", self
        );
    }
}

/// The concurrent executor split the graph into independent components.
///
/// # Log Level
/// `debug!`
pub struct ComponentsPartitioned {
    pub component_count: usize,
    pub unit_count: usize,
}

impl Display for ComponentsPartitioned {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Partitioned {} units into {} independent components",
            self.unit_count, self.component_count
        )
    }
}

impl StructuredLog for ComponentsPartitioned {
    fn log(&self) {
        tracing::debug!(
            component_count = self.component_count,
            unit_count = self.unit_count,
            "{}", self
        );
    }
}
