// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod concurrent;
pub mod factory;
mod lifecycle;
pub mod plan;
pub mod report;
pub mod run_state;
pub mod sequential;

pub use concurrent::ConcurrentExecutor;
pub use factory::ExecutorFactory;
pub use plan::{ExecutionPlan, RunSettings, UnitTable};
pub use report::{RunOutcome, RunReport, UnitStats};
pub use run_state::RunPhase;
pub use sequential::SequentialExecutor;
