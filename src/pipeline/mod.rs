// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline definition surface and run lifecycle.
//!
//! A [`Pipeline`] owns its graph until it is run. Running freezes the graph
//! (validating it), hands it to the executor picked by the engine
//! configuration and guarantees teardown on every exit path. A frozen
//! pipeline cannot be extended or run again.
//!
//! # Examples
//!
//! ## Bound pipeline
//! ```
//! use the_pipeworks::{Pipeline, Processor};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), the_pipeworks::PipelineError> {
//! let mut pipeline = Pipeline::new();
//! let pairs = pipeline.add(Processor::source("pairs", || vec![("success", (3i64, 4i64))]))?;
//! let add = pipeline.add(Processor::transform("add", |(a, b): (i64, i64)| {
//!     [("success", (a + b, 0))]
//! }))?;
//! let print = pipeline.add(Processor::sink("print", |(sum, _): (i64, i64)| println!("{sum}")))?;
//! pipeline.connect(pairs, add)?;
//! pipeline.connect(add, print)?;
//!
//! let report = pipeline.run().await?;
//! assert!(report.is_drained());
//! assert_eq!(report.invocations(print), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Unbound pipeline
//! ```
//! use the_pipeworks::{Pipeline, Processor};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), the_pipeworks::PipelineError> {
//! let mut pipeline = Pipeline::new();
//! let ticks = pipeline.add(Processor::source("ticks", || (0u64..).map(|n| ("success", n))))?;
//! let stop = pipeline.cancel_signal();
//! let sink = pipeline.add(Processor::sink("sink", move |n: u64| {
//!     if n == 99 {
//!         stop.cancel();
//!     }
//! }))?;
//! pipeline.connect(ticks, sink)?;
//!
//! let report = pipeline.run().await?;
//! assert!(report.is_cancelled());
//! assert_eq!(report.invocations(sink), 100);
//! # Ok(())
//! # }
//! ```

mod chain;
mod handle;

pub use chain::Chain;
pub use handle::{CancelSignal, RunHandle};

pub use crate::engine::{RunOutcome, RunReport};

use tokio_util::sync::CancellationToken;

use crate::config::consts::DEFAULT_RELATIONSHIP;
use crate::config::{EngineConfig, ExecutionMode, RoutingMode};
use crate::engine::{ExecutionPlan, ExecutorFactory, RunSettings};
use crate::errors::{PipelineError, PipelineReuseError};
use crate::graph::{Edge, Payload, PipelineGraph, Processor, UnitId};

/// One upstream end of a [`Pipeline::funnel`]: a unit plus the relationship to
/// take from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub unit: UnitId,
    pub relationship: String,
}

impl From<UnitId> for Link {
    fn from(unit: UnitId) -> Self {
        Self {
            unit,
            relationship: DEFAULT_RELATIONSHIP.to_string(),
        }
    }
}

impl From<(UnitId, &str)> for Link {
    fn from((unit, relationship): (UnitId, &str)) -> Self {
        Self {
            unit,
            relationship: relationship.to_string(),
        }
    }
}

impl From<(UnitId, String)> for Link {
    fn from((unit, relationship): (UnitId, String)) -> Self {
        Self { unit, relationship }
    }
}

/// A pipeline under construction, and the handle that runs it.
pub struct Pipeline<T: Payload> {
    graph: Option<PipelineGraph<T>>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl<T: Payload> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload> Pipeline<T> {
    pub fn new() -> Self {
        Self {
            graph: Some(PipelineGraph::new()),
            config: EngineConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail the run when a record's relationship has no consumer.
    pub fn strict(mut self) -> Self {
        self.config.routing = RoutingMode::Strict;
        self
    }

    /// Drive independent components on separate tokio tasks.
    pub fn concurrent(mut self) -> Self {
        self.config.mode = ExecutionMode::Concurrent;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Signal that stops this pipeline's run. Available before the run starts
    /// so units can capture it.
    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal::new(self.cancel.clone())
    }

    pub fn is_frozen(&self) -> bool {
        self.graph.is_none()
    }

    /// Edges connected so far, in connect order. Empty once frozen.
    pub fn edges(&self) -> &[Edge] {
        self.graph.as_ref().map(PipelineGraph::edges).unwrap_or(&[])
    }

    fn graph_mut(&mut self, operation: &'static str) -> Result<&mut PipelineGraph<T>, PipelineReuseError> {
        self.graph.as_mut().ok_or(PipelineReuseError { operation })
    }

    /// Take ownership of `processor` and return its id.
    pub fn add(&mut self, processor: Processor<T>) -> Result<UnitId, PipelineError> {
        Ok(self.graph_mut("add a unit")?.add(processor))
    }

    /// Connect over the default `"success"` relationship. Returns `downstream`.
    pub fn connect(&mut self, upstream: UnitId, downstream: UnitId) -> Result<UnitId, PipelineError> {
        self.connect_via(upstream, DEFAULT_RELATIONSHIP, downstream)
    }

    /// Connect over a named relationship. Returns `downstream`.
    pub fn connect_via(
        &mut self,
        upstream: UnitId,
        relationship: &str,
        downstream: UnitId,
    ) -> Result<UnitId, PipelineError> {
        self.graph_mut("connect units")?
            .connect(upstream, relationship, downstream)?;
        Ok(downstream)
    }

    /// Start a fluent chain at `start`.
    pub fn chain(&mut self, start: UnitId) -> Chain<'_, T> {
        Chain::new(self, start)
    }

    /// Connect several upstream ends to one downstream unit.
    ///
    /// Each end is a bare [`UnitId`] (default relationship) or a
    /// `(UnitId, relationship)` pair. Stops at the first failing connection;
    /// connections made before it are kept.
    pub fn funnel<I, L>(&mut self, upstreams: I, downstream: UnitId) -> Result<UnitId, PipelineError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Link>,
    {
        for link in upstreams {
            let link = link.into();
            self.connect_via(link.unit, &link.relationship, downstream)?;
        }
        Ok(downstream)
    }

    /// Validate and take the graph. A graph that fails validation is put back
    /// so the caller can fix it.
    fn freeze(&mut self, operation: &'static str) -> Result<ExecutionPlan<T>, PipelineError> {
        let graph = self.graph.take().ok_or(PipelineReuseError { operation })?;
        match ExecutionPlan::try_freeze(graph, RunSettings::from(&self.config)) {
            Ok(plan) => Ok(plan),
            Err((graph, error)) => {
                self.graph = Some(graph);
                Err(error.into())
            }
        }
    }

    /// Freeze the graph and run it on its own tokio task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&mut self) -> Result<RunHandle, PipelineError> {
        let plan = self.freeze("spawn a run")?;
        let executor = ExecutorFactory::from_config::<T>(&self.config);
        let cancel = self.cancel.clone();

        let token = cancel.clone();
        let task = tokio::spawn(async move { executor.execute(plan, token).await });
        Ok(RunHandle::new(cancel, task))
    }

    /// Freeze the graph, run it to completion and return the report.
    ///
    /// Dropping the returned future cancels the run; teardown still completes
    /// on the worker task.
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        self.spawn()?.join().await
    }

    /// Build a pipeline inside `build`, then run it.
    ///
    /// Nothing runs if `build` fails.
    ///
    /// ```
    /// use the_pipeworks::config::EngineConfig;
    /// use the_pipeworks::{Pipeline, Processor};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), the_pipeworks::PipelineError> {
    /// let report = Pipeline::scoped(EngineConfig::default(), |p| {
    ///     let words = p.add(Processor::source("words", || vec![("success", "hi".to_string())]))?;
    ///     let shout = p.add(Processor::sink("shout", |w: String| println!("{}", w.to_uppercase())))?;
    ///     p.connect(words, shout)?;
    ///     Ok(())
    /// })
    /// .await?;
    /// assert_eq!(report.records_pulled, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<F>(config: EngineConfig, build: F) -> Result<RunReport, PipelineError>
    where
        F: FnOnce(&mut Pipeline<T>) -> Result<(), PipelineError>,
    {
        let mut pipeline = Pipeline::new().with_config(config);
        build(&mut pipeline)?;
        pipeline.run().await
    }
}

impl<T: Payload> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("frozen", &self.is_frozen())
            .field("units", &self.graph.as_ref().map_or(0, PipelineGraph::len))
            .field("edges", &self.edges().len())
            .field("config", &self.config)
            .finish()
    }
}
