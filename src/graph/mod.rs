// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod pipeline_graph;
pub mod record;
pub mod registry;
pub mod unit;
pub mod validation;

pub use pipeline_graph::{Edge, PipelineGraph};
pub use record::{Payload, Record, RecordStream};
pub use registry::{RelationshipRegistry, RouteOutcome};
pub use unit::{Arity, ProcessingUnit, Processor, UnitId};
pub use validation::validate_graph;

pub use crate::config::consts::DEFAULT_RELATIONSHIP;
