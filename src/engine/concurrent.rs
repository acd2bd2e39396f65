// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent executor: one sequential worker per independent component.
//!
//! The frozen graph is partitioned into weakly connected components. Each
//! component runs on its own tokio task with the same breadth-first loop as
//! the sequential executor, and owns its units outright. A unit with several
//! upstream edges always lands in the component of all its upstreams, so it
//! is only ever invoked by one worker and needs no lock.
//!
//! Workers share a child of the caller's cancellation token. The first worker
//! to fail cancels that token, so its siblings stop at their next step
//! boundary and tear down; the first failure is the one reported.

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::plan::ExecutionPlan;
use crate::engine::report::RunReport;
use crate::engine::sequential::{drive, log_completion};
use crate::errors::PipelineError;
use crate::graph::Payload;
use crate::observability::messages::engine::{ComponentsPartitioned, RunStarted};
use crate::observability::messages::StructuredLog;
use crate::traits::PipelineExecutor;

const STRATEGY: &str = "concurrent";

#[derive(Debug, Clone, Default)]
pub struct ConcurrentExecutor;

impl ConcurrentExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T: Payload> PipelineExecutor<T> for ConcurrentExecutor {
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

        let unit_count = plan.unit_count();
        let components = plan.partition();
        ComponentsPartitioned {
            component_count: components.len(),
            unit_count,
        }
        .log();

        let group = cancel.child_token();
        let mut workers = JoinSet::new();
        for component in components {
            let token = group.clone();
            workers.spawn(
                async move {
                    let result = drive(component, token.clone()).await;
                    if result.is_err() {
                        token.cancel();
                    }
                    result
                }
                .instrument(span.clone()),
            );
        }

        let mut reports = Vec::new();
        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(error)) => {
                    first_error.get_or_insert(error);
                }
                Err(join_error) => {
                    group.cancel();
                    first_error.get_or_insert(PipelineError::RunAborted {
                        reason: join_error.to_string(),
                    });
                }
            }
        }

        let result = match first_error {
            Some(error) => Err(error),
            None => Ok(RunReport::merge(reports)),
        };
        log_completion(STRATEGY, &result);
        result
    }

    fn strategy(&self) -> &'static str {
        STRATEGY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plan::RunSettings;
    use crate::graph::{PipelineGraph, Processor, DEFAULT_RELATIONSHIP};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter(name: &str, count: &Arc<AtomicUsize>) -> Processor<u32> {
        let count = Arc::clone(count);
        Processor::sink(name, move |_x: u32| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_independent_chains_all_drain() {
        let left = Arc::new(AtomicUsize::new(0));
        let right = Arc::new(AtomicUsize::new(0));
        let mut graph = PipelineGraph::new();
        let a = graph.add(Processor::source("a", || (0..100u32).map(|x| ("success", x))));
        let b = graph.add(Processor::source("b", || (0..50u32).map(|x| ("success", x))));
        let a_out = graph.add(counter("a_out", &left));
        let b_out = graph.add(counter("b_out", &right));
        graph.connect(a, DEFAULT_RELATIONSHIP, a_out).unwrap();
        graph.connect(b, DEFAULT_RELATIONSHIP, b_out).unwrap();

        let plan = ExecutionPlan::freeze(graph, RunSettings::default()).unwrap();
        let report = ConcurrentExecutor::new()
            .execute(plan, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_drained());
        assert_eq!(left.load(Ordering::SeqCst), 100);
        assert_eq!(right.load(Ordering::SeqCst), 50);
        assert_eq!(report.records_pulled, 150);
        assert_eq!(report.invocations(b_out), 50);
    }

    #[tokio::test]
    async fn test_failure_in_one_component_cancels_the_other() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut graph = PipelineGraph::new();
        let endless = graph.add(Processor::source("endless", || (0u32..).map(|x| ("success", x))));
        let broken = graph.add(Processor::source("broken", || vec![("success", 1u32)]));
        let endless_out = graph.add(counter("endless_out", &seen));
        let fail = graph.add(Processor::try_sink("fail", |_x: u32| Err("disk full")));
        graph.connect(endless, DEFAULT_RELATIONSHIP, endless_out).unwrap();
        graph.connect(broken, DEFAULT_RELATIONSHIP, fail).unwrap();

        let plan = ExecutionPlan::freeze(graph, RunSettings::default()).unwrap();
        let error = ConcurrentExecutor::new()
            .execute(plan, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.unit_id(), Some(fail));
    }
}
