// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod processor;

pub use executor::PipelineExecutor;
pub use processor::{SourceTask, TransformTask};
