// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // engine configuration
pub mod engine;        // pipeline executors
pub mod errors;        // error handling
pub mod graph;         // units, edges, routing
pub mod observability;
pub mod pipeline;      // definition surface + lifecycle
pub mod traits;        // unified abstractions

pub use graph::{Arity, Processor, ProcessingUnit, Record, UnitId, DEFAULT_RELATIONSHIP};
pub use pipeline::{CancelSignal, Pipeline, RunHandle, RunOutcome, RunReport};
pub use errors::{BoxError, PipelineError};
