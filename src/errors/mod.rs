// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for pipeline assembly, freezing and execution.
//!
//! Structural problems ([`CycleError`], [`GraphValidationError`]) are raised while
//! a pipeline is assembled or frozen and never surface mid-run. Run-time problems
//! ([`UnitExecutionError`], [`UnroutedOutputError`]) abort the run after teardown.
//! Everything the public API returns is wrapped in [`PipelineError`].

mod config;
mod execution;
mod graph;

pub use config::ConfigError;
pub use execution::{InvocationStage, UnitExecutionError, UnroutedOutputError};
pub use graph::{CycleError, GraphIssue, GraphValidationError};

use thiserror::Error;

/// Error type returned by wrapped callables and task objects.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Attempt to assemble or run a pipeline whose graph was already frozen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pipeline graph is frozen and cannot be reused (attempted to {operation})")]
pub struct PipelineReuseError {
    pub operation: &'static str,
}

/// Top-level error for everything a [`Pipeline`](crate::pipeline::Pipeline) can report.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Validation(#[from] GraphValidationError),

    #[error(transparent)]
    UnitExecution(#[from] UnitExecutionError),

    #[error(transparent)]
    Unrouted(#[from] UnroutedOutputError),

    #[error(transparent)]
    Reuse(#[from] PipelineReuseError),

    /// The worker driving the run panicked or was aborted before reporting.
    #[error("pipeline run aborted: {reason}")]
    RunAborted { reason: String },
}

impl PipelineError {
    /// Id of the unit the error is attributed to, if any.
    pub fn unit_id(&self) -> Option<crate::graph::UnitId> {
        match self {
            PipelineError::UnitExecution(e) => Some(e.unit_id),
            PipelineError::Unrouted(e) => Some(e.unit_id),
            _ => None,
        }
    }
}
