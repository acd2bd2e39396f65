// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sequential executor: one step at a time, breadth-first.
//!
//! # Architecture Overview
//!
//! The executor keeps a FIFO work queue of `(target unit, payload)` pairs and a
//! round-robin ring of open source streams. Each step is one of:
//!
//! - **Work step**: pop the front pair, invoke the target, route its outputs
//!   onto the back of the queue through the relationship registry
//! - **Pull step**: when the queue is empty, pull one record from the next
//!   source and route it; an exhausted source is retired
//!
//! ```text
//!   sources (round robin)            work queue (FIFO)
//!   ┌─────────┐ pull when empty   ┌──────────────────────┐
//!   │ numbers │ ───────────────▶  │ (add, 3) (minus, 3)  │ ──▶ invoke ──┐
//!   │ words   │                   └──────────────────────┘              │
//!   └─────────┘                              ▲        route outputs     │
//!                                            └──────────────────────────┘
//! ```
//!
//! Draining the queue before the next pull processes each source record as
//! one breadth-first burst, so memory stays bounded even for infinite
//! sources. No unit ever invokes its downstream units directly.
//!
//! # Termination
//!
//! - **Drained**: the queue is empty and every source is exhausted
//! - **Cancelled**: the token fired; checked before every step and after every pull
//! - **Failed**: a unit failed or strict routing rejected a record
//!
//! Suspension happens only while a source's stream is pending, plus a
//! cooperative yield every `yield_interval` steps so a cancel issued from
//! another task is observed even when every source is always ready.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::RoutingMode;
use crate::engine::lifecycle::{setup_all, teardown_all};
use crate::engine::plan::{ExecutionPlan, RunSettings, UnitTable};
use crate::engine::report::{RunOutcome, RunReport};
use crate::engine::run_state::{RunPhase, RunState};
use crate::errors::{
    GraphIssue, GraphValidationError, PipelineError, UnitExecutionError, UnroutedOutputError,
};
use crate::graph::unit::panic_error;
use crate::graph::{Payload, ProcessingUnit, Record, RelationshipRegistry, RouteOutcome, UnitId};
use crate::observability::messages::engine::{RecordDropped, RunCancelled, RunDrained, RunFailed, RunStarted};
use crate::observability::messages::unit::UnitFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::PipelineExecutor;

const STRATEGY: &str = "sequential";

/// Drives the whole graph on the calling task.
#[derive(Debug, Clone, Default)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T: Payload> PipelineExecutor<T> for SequentialExecutor {
    async fn execute(
        &self,
        plan: ExecutionPlan<T>,
        cancel: CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let started = RunStarted {
            strategy: STRATEGY,
            unit_count: plan.unit_count(),
            source_count: plan.source_count(),
        };
        started.log();
        let span = started.span(STRATEGY);

        let result = drive(plan, cancel).instrument(span).await;
        log_completion(STRATEGY, &result);
        result
    }

    fn strategy(&self) -> &'static str {
        STRATEGY
    }
}

pub(crate) fn log_completion(strategy: &str, result: &Result<RunReport, PipelineError>) {
    match result {
        Ok(report) if report.is_drained() => RunDrained {
            strategy,
            steps: report.steps,
            elapsed: report.elapsed,
        }
        .log(),
        Ok(report) => RunCancelled {
            strategy,
            steps: report.steps,
            in_flight: report.records_discarded as usize,
            elapsed: report.elapsed,
        }
        .log(),
        Err(error) => RunFailed { strategy, error }.log(),
    }
}

/// Set up, run and tear down one plan on the current task.
///
/// Teardown covers every unit whose setup succeeded, on every exit path. A
/// teardown failure is returned only if the run itself succeeded.
pub(crate) async fn drive<T: Payload>(
    mut plan: ExecutionPlan<T>,
    cancel: CancellationToken,
) -> Result<RunReport, PipelineError> {
    let set_up = setup_all(&mut plan.units).await?;

    let mut state = RunState::new(plan.units.capacity());
    state.start();

    let result = match open_sources(&mut plan.units, &mut state) {
        Ok(()) => {
            let mut worker = Worker {
                units: &mut plan.units,
                registry: &plan.registry,
                settings: plan.settings,
                state: &mut state,
                cancel: &cancel,
            };
            worker.run().await
        }
        Err(error) => Err(error.into()),
    };

    state.finish(match &result {
        Ok(RunOutcome::Drained) => RunPhase::Drained,
        Ok(RunOutcome::Cancelled) => RunPhase::Cancelled,
        Err(_) => RunPhase::Failed,
    });

    let teardown = teardown_all(&mut plan.units, &set_up, result.is_err()).await;

    result?;
    teardown?;
    Ok(state.report(&plan.units))
}

fn open_sources<T: Payload>(
    units: &mut UnitTable<T>,
    state: &mut RunState<T>,
) -> Result<(), UnitExecutionError> {
    for id in units.source_ids() {
        let Some(unit) = units.get_mut(id) else {
            continue;
        };
        match unit.open() {
            Ok(stream) => state.add_source(id, stream),
            Err(error) => {
                UnitFailed { error: &error }.log();
                return Err(error);
            }
        }
    }
    Ok(())
}

struct Worker<'a, T: Payload> {
    units: &'a mut UnitTable<T>,
    registry: &'a RelationshipRegistry,
    settings: RunSettings,
    state: &'a mut RunState<T>,
    cancel: &'a CancellationToken,
}

impl<T: Payload> Worker<'_, T> {
    async fn run(&mut self) -> Result<RunOutcome, PipelineError> {
        let mut since_yield = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled);
            }

            if since_yield >= self.settings.yield_interval {
                tokio::task::yield_now().await;
                since_yield = 0;
                continue;
            }

            if let Some((target, payload)) = self.state.next_work() {
                self.invoke(target, payload)?;
                since_yield += 1;
                continue;
            }

            if self.state.is_drained() {
                return Ok(RunOutcome::Drained);
            }
            let Some(mut source) = self.state.next_source() else {
                continue;
            };

            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                item = AssertUnwindSafe(source.stream.next()).catch_unwind() => {
                    Some(item.unwrap_or_else(|payload| Some(Err(panic_error(payload)))))
                }
            };
            let name = self.unit(source.id)?.name().to_string();

            match pulled {
                None => {
                    self.state.requeue_source(source);
                    return Ok(RunOutcome::Cancelled);
                }
                Some(None) => self.state.retire_source(source, &name),
                Some(Some(Err(cause))) => {
                    let error = self.unit(source.id)?.pull_failure(cause);
                    UnitFailed { error: &error }.log();
                    return Err(error.into());
                }
                Some(Some(Ok(record))) => {
                    self.state.record_pull(&mut source);
                    let id = source.id;
                    self.state.requeue_source(source);
                    if self.cancel.is_cancelled() {
                        self.state.record_discard();
                        return Ok(RunOutcome::Cancelled);
                    }
                    self.route(id, &name, vec![record])?;
                    since_yield += 1;
                }
            }
        }
    }

    fn invoke(&mut self, target: UnitId, payload: T) -> Result<(), PipelineError> {
        let unit = self
            .units
            .get_mut(target)
            .ok_or_else(|| GraphValidationError::single(GraphIssue::UnknownUnit { unit_id: target }))?;

        let outputs = match unit.invoke(payload) {
            Ok(outputs) => outputs,
            Err(error) => {
                UnitFailed { error: &error }.log();
                return Err(error.into());
            }
        };
        self.state.record_invocation(target);

        tracing::trace!(
            unit = unit.name(),
            outputs = outputs.len(),
            step = self.state.steps(),
            "Invoked unit"
        );

        let name = unit.name().to_string();
        self.route(target, &name, outputs)
    }

    fn route(&mut self, from: UnitId, name: &str, outputs: Vec<Record<T>>) -> Result<(), PipelineError> {
        route_outputs(
            self.registry,
            self.settings.routing,
            self.state,
            from,
            name,
            outputs,
        )
        .map_err(PipelineError::from)
    }

    fn unit(&self, id: UnitId) -> Result<&ProcessingUnit<T>, GraphValidationError> {
        self.units
            .get(id)
            .ok_or_else(|| GraphValidationError::single(GraphIssue::UnknownUnit { unit_id: id }))
    }
}

/// Route every output of one invocation, in emission order.
fn route_outputs<T: Payload>(
    registry: &RelationshipRegistry,
    routing: RoutingMode,
    state: &mut RunState<T>,
    from: UnitId,
    name: &str,
    outputs: Vec<Record<T>>,
) -> Result<(), UnroutedOutputError> {
    for record in outputs {
        let outcome = registry.route(from, record, |target, payload| state.enqueue(target, payload));
        let RouteOutcome::Unrouted(record) = outcome else {
            continue;
        };
        match routing {
            RoutingMode::Lenient => {
                RecordDropped {
                    unit: name,
                    relationship: &record.relationship,
                }
                .log();
                state.record_drop();
            }
            RoutingMode::Strict => {
                return Err(UnroutedOutputError {
                    unit_id: from,
                    unit: name.to_string(),
                    relationship: record.relationship,
                    payload: format!("{:?}", record.payload),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PipelineGraph, Processor, DEFAULT_RELATIONSHIP};
    use std::sync::{Arc, Mutex};

    fn plan(graph: PipelineGraph<i64>, routing: RoutingMode) -> ExecutionPlan<i64> {
        let settings = RunSettings {
            routing,
            yield_interval: 64,
        };
        ExecutionPlan::freeze(graph, settings).unwrap()
    }

    fn collector(seen: &Arc<Mutex<Vec<i64>>>) -> Processor<i64> {
        let seen = Arc::clone(seen);
        Processor::sink("collect", move |x: i64| seen.lock().unwrap().push(x))
    }

    #[tokio::test]
    async fn test_breadth_first_order_per_burst() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut graph = PipelineGraph::new();
        let src = graph.add(Processor::source("src", || vec![("success", 1i64), ("success", 2)]));
        let fan = graph.add(Processor::transform("fan", |x: i64| {
            vec![("success", x * 10), ("success", x * 10 + 1)]
        }));
        let out = graph.add(collector(&seen));
        graph.connect(src, DEFAULT_RELATIONSHIP, fan).unwrap();
        graph.connect(fan, DEFAULT_RELATIONSHIP, out).unwrap();

        let report = SequentialExecutor::new()
            .execute(plan(graph, RoutingMode::Lenient), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_drained());
        assert_eq!(*seen.lock().unwrap(), vec![10, 11, 20, 21]);
        assert_eq!(report.records_pulled, 2);
        // 2 pulls + 2 fan invocations + 4 sink invocations
        assert_eq!(report.steps, 8);
        assert_eq!(report.invocations(out), 4);
    }

    #[tokio::test]
    async fn test_sources_are_pulled_round_robin() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut graph = PipelineGraph::new();
        let odd = graph.add(Processor::source("odd", || vec![("success", 1i64), ("success", 3)]));
        let even = graph.add(Processor::source("even", || vec![("success", 2i64), ("success", 4)]));
        let out = graph.add(collector(&seen));
        graph.connect(odd, DEFAULT_RELATIONSHIP, out).unwrap();
        graph.connect(even, DEFAULT_RELATIONSHIP, out).unwrap();

        SequentialExecutor::new()
            .execute(plan(graph, RoutingMode::Lenient), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_lenient_routing_drops_and_counts() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(Processor::source("src", || vec![("success", 1i64), ("success", -1)]));
        let check = graph.add(
            Processor::transform("check", |x: i64| {
                if x < 0 {
                    vec![("negative", x)]
                } else {
                    vec![("success", x)]
                }
            })
            .terminal(),
        );
        graph.connect(src, DEFAULT_RELATIONSHIP, check).unwrap();

        let report = SequentialExecutor::new()
            .execute(plan(graph, RoutingMode::Lenient), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_drained());
        assert_eq!(report.records_dropped, 2);
    }

    #[tokio::test]
    async fn test_strict_routing_fails_on_unrouted_output() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(Processor::source("src", || vec![("success", 5i64)]));
        let check = graph.add(Processor::transform("check", |x: i64| vec![("odd", x)]).terminal());
        graph.connect(src, DEFAULT_RELATIONSHIP, check).unwrap();

        let error = SequentialExecutor::new()
            .execute(plan(graph, RoutingMode::Strict), CancellationToken::new())
            .await
            .unwrap_err();

        match error {
            PipelineError::Unrouted(unrouted) => {
                assert_eq!(unrouted.unit, "check");
                assert_eq!(unrouted.relationship, "odd");
                assert_eq!(unrouted.payload, "5");
            }
            other => panic!("Expected unrouted error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_pull_is_reported_against_the_source() {
        let mut graph = PipelineGraph::new();
        let src = graph.add(Processor::try_source("flaky", || {
            vec![Ok(("success", 1i64)), Err("socket closed")]
        }));
        let out = graph.add(Processor::sink("out", |_x: i64| {}));
        graph.connect(src, DEFAULT_RELATIONSHIP, out).unwrap();

        let error = SequentialExecutor::new()
            .execute(plan(graph, RoutingMode::Lenient), CancellationToken::new())
            .await
            .unwrap_err();

        let PipelineError::UnitExecution(failure) = error else {
            panic!("Expected unit execution error");
        };
        assert_eq!(failure.unit, "flaky");
        assert_eq!(failure.stage, crate::errors::InvocationStage::Pull);
        assert_eq!(failure.source.to_string(), "socket closed");
    }

    #[tokio::test]
    async fn test_already_cancelled_run_does_no_work() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut graph = PipelineGraph::new();
        let src = graph.add(Processor::source("src", || (0i64..).map(|x| ("success", x))));
        let out = graph.add(collector(&seen));
        graph.connect(src, DEFAULT_RELATIONSHIP, out).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = SequentialExecutor::new()
            .execute(plan(graph, RoutingMode::Lenient), cancel)
            .await
            .unwrap();

        assert!(report.is_cancelled());
        assert_eq!(report.steps, 0);
        assert!(seen.lock().unwrap().is_empty());
    }
}
