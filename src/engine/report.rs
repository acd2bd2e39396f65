// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::time::Duration;

use crate::graph::UnitId;

/// How a successful run ended. Failures are reported as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every source was exhausted and every queued record was processed
    Drained,
    /// The cancel signal stopped the run at a step boundary
    Cancelled,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Drained => f.write_str("drained"),
            RunOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Per-unit counters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStats {
    pub id: UnitId,
    pub name: String,
    /// Records pulled for sources, invocations for transforms and sinks
    pub invocations: u64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Source pulls that yielded a record plus unit invocations
    pub steps: u64,
    pub records_pulled: u64,
    /// Records dropped by lenient routing
    pub records_dropped: u64,
    /// Records still queued when a cancelled run stopped
    pub records_discarded: u64,
    /// Sorted by unit id
    pub units: Vec<UnitStats>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_drained(&self) -> bool {
        self.outcome == RunOutcome::Drained
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    /// Counter for one unit, zero if the unit never ran.
    pub fn invocations(&self, id: UnitId) -> u64 {
        self.units
            .iter()
            .find(|stats| stats.id == id)
            .map(|stats| stats.invocations)
            .unwrap_or(0)
    }

    /// Counter summed over every unit with this name.
    pub fn invocations_of(&self, name: &str) -> u64 {
        self.units
            .iter()
            .filter(|stats| stats.name == name)
            .map(|stats| stats.invocations)
            .sum()
    }

    /// Combine the reports of independent workers into one.
    ///
    /// The merged run counts as cancelled if any worker was cancelled; elapsed
    /// time is that of the slowest worker.
    pub fn merge(reports: impl IntoIterator<Item = RunReport>) -> RunReport {
        let mut merged = RunReport {
            outcome: RunOutcome::Drained,
            steps: 0,
            records_pulled: 0,
            records_dropped: 0,
            records_discarded: 0,
            units: Vec::new(),
            elapsed: Duration::ZERO,
        };

        for report in reports {
            if report.outcome == RunOutcome::Cancelled {
                merged.outcome = RunOutcome::Cancelled;
            }
            merged.steps += report.steps;
            merged.records_pulled += report.records_pulled;
            merged.records_dropped += report.records_dropped;
            merged.records_discarded += report.records_discarded;
            merged.units.extend(report.units);
            merged.elapsed = merged.elapsed.max(report.elapsed);
        }

        merged.units.sort_by_key(|stats| stats.id);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome, id: usize, name: &str, invocations: u64, ms: u64) -> RunReport {
        RunReport {
            outcome,
            steps: invocations,
            records_pulled: 1,
            records_dropped: 0,
            records_discarded: 0,
            units: vec![UnitStats {
                id: UnitId::new(id),
                name: name.to_string(),
                invocations,
            }],
            elapsed: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_merge_sums_counters_and_sorts_units() {
        let merged = RunReport::merge([
            report(RunOutcome::Drained, 3, "print", 4, 10),
            report(RunOutcome::Drained, 1, "print", 2, 25),
        ]);

        assert!(merged.is_drained());
        assert_eq!(merged.steps, 6);
        assert_eq!(merged.records_pulled, 2);
        assert_eq!(merged.units[0].id, UnitId::new(1));
        assert_eq!(merged.invocations_of("print"), 6);
        assert_eq!(merged.invocations(UnitId::new(3)), 4);
        assert_eq!(merged.elapsed, Duration::from_millis(25));
    }

    #[test]
    fn test_merge_is_cancelled_if_any_worker_was() {
        let merged = RunReport::merge([
            report(RunOutcome::Drained, 0, "a", 1, 1),
            report(RunOutcome::Cancelled, 1, "b", 1, 1),
        ]);
        assert!(merged.is_cancelled());
    }

    #[test]
    fn test_merge_of_nothing_is_drained() {
        let merged = RunReport::merge(Vec::new());
        assert!(merged.is_drained());
        assert_eq!(merged.steps, 0);
    }
}
