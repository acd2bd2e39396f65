// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use super::BoxError;
use crate::graph::UnitId;

/// Point in a unit's lifecycle where its wrapped callable failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    Setup,
    /// Invoking a source to obtain its lazy sequence
    Open,
    /// Pulling the next element of a source's sequence
    Pull,
    /// Invoking a transform or sink with one record
    Invoke,
    Teardown,
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            InvocationStage::Setup => "setup",
            InvocationStage::Open => "open",
            InvocationStage::Pull => "pull",
            InvocationStage::Invoke => "invoke",
            InvocationStage::Teardown => "teardown",
        };
        f.write_str(stage)
    }
}

/// A wrapped callable failed. Fatal to the whole run.
#[derive(Error, Debug)]
#[error("unit '{unit}' ({unit_id}) failed during {stage}{}: {source}", .input.as_ref().map(|i| format!(" on input {}", i)).unwrap_or_default())]
pub struct UnitExecutionError {
    pub unit_id: UnitId,
    pub unit: String,
    pub stage: InvocationStage,
    /// `Debug` rendering of the offending record; `None` for sources and lifecycle hooks
    pub input: Option<String>,
    #[source]
    pub source: BoxError,
}

/// Strict routing only: a unit emitted a relationship nobody consumes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unit '{unit}' ({unit_id}) emitted unrouted relationship '{relationship}' with payload {payload}")]
pub struct UnroutedOutputError {
    pub unit_id: UnitId,
    pub unit: String,
    pub relationship: String,
    pub payload: String,
}
