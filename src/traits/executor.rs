// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::engine::{ExecutionPlan, RunReport};
use crate::errors::PipelineError;
use crate::graph::Payload;

/// A scheduling strategy for frozen pipelines.
#[async_trait]
pub trait PipelineExecutor<T: Payload>: Send + Sync {
    /// Run `plan` until it drains, `cancel` fires, or a unit fails.
    ///
    /// Implementations own the unit lifecycle: every unit is set up before the
    /// first step, and every unit that was set up is torn down before this
    /// returns, whatever the outcome.
    ///
    /// Returns a Result containing either:
    /// - Ok(RunReport): the run drained or was cancelled
    /// - Err(PipelineError): a unit failed, strict routing rejected a record, or a worker died
    async fn execute(
        &self,
        plan: ExecutionPlan<T>,
        cancel: CancellationToken,
    ) -> Result<RunReport, PipelineError>;

    /// Short name used in log messages.
    fn strategy(&self) -> &'static str;
}
