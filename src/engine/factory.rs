// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{EngineConfig, ExecutionMode};
use crate::engine::concurrent::ConcurrentExecutor;
use crate::engine::sequential::SequentialExecutor;
use crate::graph::Payload;
use crate::traits::PipelineExecutor;

/// Factory for creating pipeline executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create an executor based on the configured execution mode
    pub fn from_config<T: Payload>(cfg: &EngineConfig) -> Box<dyn PipelineExecutor<T>> {
        match cfg.mode {
            ExecutionMode::Sequential => Box::new(SequentialExecutor::new()),
            ExecutionMode::Concurrent => Box::new(ConcurrentExecutor::new()),
        }
    }
}
