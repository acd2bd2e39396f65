// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for unit failures.

use crate::errors::UnitExecutionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A unit failed during setup, open, pull or invoke. The run is aborted.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct UnitFailed<'a> {
    pub error: &'a UnitExecutionError,
}

impl Display for UnitFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl StructuredLog for UnitFailed<'_> {
    fn log(&self) {
        tracing::error!(
            unit = %self.error.unit,
            unit_id = %self.error.unit_id,
            stage = %self.error.stage,
            input = self.error.input.as_deref(),
            "{}", self
        );
    }
}

/// A unit's teardown hook failed.
///
/// # Log Level
/// `warn!` - Resources may have leaked, but the run's result stands
pub struct TeardownFailed<'a> {
    pub error: &'a UnitExecutionError,
    /// Whether the run had already failed, in which case this error is not returned
    pub suppressed: bool,
}

impl Display for TeardownFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.suppressed {
            write!(f, "{} (suppressed, run already failed)", self.error)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

impl StructuredLog for TeardownFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = %self.error.unit,
            unit_id = %self.error.unit_id,
            suppressed = self.suppressed,
            "{}", self
        );
    }
}
