// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-run bookkeeping: the work queue, active sources and counters.
//!
//! A `RunState` is created when a worker starts and dropped when it returns,
//! so nothing here survives from one run to the next.

use std::collections::VecDeque;
use std::time::Instant;

use crate::engine::plan::UnitTable;
use crate::engine::report::{RunOutcome, RunReport, UnitStats};
use crate::graph::{Payload, RecordStream, UnitId};
use crate::observability::messages::engine::SourceExhausted;
use crate::observability::messages::StructuredLog;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Drained,
    Cancelled,
    Failed,
}

impl RunPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, RunPhase::Drained | RunPhase::Cancelled | RunPhase::Failed)
    }
}

/// A source whose stream is still open.
pub(crate) struct ActiveSource<T> {
    pub id: UnitId,
    pub stream: RecordStream<T>,
    pub pulled: u64,
}

pub(crate) struct RunState<T: Payload> {
    phase: RunPhase,
    queue: VecDeque<(UnitId, T)>,
    sources: VecDeque<ActiveSource<T>>,
    invocations: Vec<u64>,
    steps: u64,
    pulled: u64,
    dropped: u64,
    discarded: u64,
    started: Instant,
}

impl<T: Payload> RunState<T> {
    /// Fresh state for a unit id space of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            phase: RunPhase::Idle,
            queue: VecDeque::new(),
            sources: VecDeque::new(),
            invocations: vec![0; capacity],
            steps: 0,
            pulled: 0,
            dropped: 0,
            discarded: 0,
            started: Instant::now(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// `Idle -> Running`. Later calls are ignored.
    pub fn start(&mut self) {
        if self.phase == RunPhase::Idle {
            self.phase = RunPhase::Running;
            self.started = Instant::now();
        }
    }

    /// Move to a terminal phase. The first terminal phase wins.
    pub fn finish(&mut self, phase: RunPhase) {
        if !self.phase.is_finished() && phase.is_finished() {
            self.phase = phase;
            if phase == RunPhase::Cancelled {
                self.discarded += self.queue.len() as u64;
                self.queue.clear();
            }
        }
    }

    pub fn enqueue(&mut self, target: UnitId, payload: T) {
        self.queue.push_back((target, payload));
    }

    pub fn next_work(&mut self) -> Option<(UnitId, T)> {
        self.queue.pop_front()
    }

    pub fn add_source(&mut self, id: UnitId, stream: RecordStream<T>) {
        self.sources.push_back(ActiveSource {
            id,
            stream,
            pulled: 0,
        });
    }

    /// Next source in round-robin order. Hand it back with
    /// [`requeue_source`](Self::requeue_source) or [`retire_source`](Self::retire_source).
    pub fn next_source(&mut self) -> Option<ActiveSource<T>> {
        self.sources.pop_front()
    }

    pub fn requeue_source(&mut self, source: ActiveSource<T>) {
        self.sources.push_back(source);
    }

    pub fn retire_source(&mut self, source: ActiveSource<T>, name: &str) {
        SourceExhausted {
            unit: name,
            records_pulled: source.pulled,
        }
        .log();
    }

    /// A source yielded one record.
    pub fn record_pull(&mut self, source: &mut ActiveSource<T>) {
        source.pulled += 1;
        self.pulled += 1;
        self.count_step(source.id);
    }

    /// A transform or sink was invoked once.
    pub fn record_invocation(&mut self, id: UnitId) {
        self.count_step(id);
    }

    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    /// A pulled record was abandoned because the run was cancelled.
    pub fn record_discard(&mut self) {
        self.discarded += 1;
    }

    fn count_step(&mut self, id: UnitId) {
        self.steps += 1;
        if let Some(count) = self.invocations.get_mut(id.index()) {
            *count += 1;
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Nothing queued and no source left to pull.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.sources.is_empty()
    }

    /// Summary of a run that reached `Drained` or `Cancelled`.
    pub fn report(&self, units: &UnitTable<T>) -> RunReport {
        let outcome = match self.phase {
            RunPhase::Cancelled => RunOutcome::Cancelled,
            _ => RunOutcome::Drained,
        };
        RunReport {
            outcome,
            steps: self.steps,
            records_pulled: self.pulled,
            records_dropped: self.dropped,
            records_discarded: self.discarded,
            units: units
                .iter()
                .map(|unit| UnitStats {
                    id: unit.id(),
                    name: unit.name().to_string(),
                    invocations: self.invocations.get(unit.id().index()).copied().unwrap_or(0),
                })
                .collect(),
            elapsed: self.started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};

    fn empty_stream() -> RecordStream<i32> {
        stream::empty().boxed()
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut state = RunState::new(3);
        state.enqueue(UnitId::new(1), 10);
        state.enqueue(UnitId::new(2), 20);
        state.enqueue(UnitId::new(1), 11);

        assert_eq!(state.next_work(), Some((UnitId::new(1), 10)));
        assert_eq!(state.next_work(), Some((UnitId::new(2), 20)));
        assert_eq!(state.next_work(), Some((UnitId::new(1), 11)));
        assert_eq!(state.next_work(), None);
    }

    #[test]
    fn test_sources_rotate_round_robin() {
        let mut state: RunState<i32> = RunState::new(2);
        state.add_source(UnitId::new(0), empty_stream());
        state.add_source(UnitId::new(1), empty_stream());

        let first = state.next_source().unwrap();
        assert_eq!(first.id, UnitId::new(0));
        state.requeue_source(first);

        let second = state.next_source().unwrap();
        assert_eq!(second.id, UnitId::new(1));
        state.retire_source(second, "b");

        assert!(!state.is_drained());
        assert_eq!(state.next_source().map(|s| s.id), Some(UnitId::new(0)));
        assert!(state.is_drained());
    }

    #[test]
    fn test_phase_transitions() {
        let mut state: RunState<i32> = RunState::new(1);
        assert_eq!(state.phase(), RunPhase::Idle);
        state.start();
        assert_eq!(state.phase(), RunPhase::Running);
        state.finish(RunPhase::Failed);
        state.finish(RunPhase::Drained);
        assert_eq!(state.phase(), RunPhase::Failed);
    }

    #[test]
    fn test_cancel_discards_queued_records() {
        let mut state = RunState::new(2);
        state.start();
        state.enqueue(UnitId::new(1), 1);
        state.enqueue(UnitId::new(1), 2);
        state.finish(RunPhase::Cancelled);

        assert!(state.next_work().is_none());
        assert_eq!(state.discarded, 2);
    }

    #[test]
    fn test_report_outcome_follows_phase() {
        let units = UnitTable::new(Vec::new());
        let mut state: RunState<i32> = RunState::new(0);
        state.start();
        state.finish(RunPhase::Cancelled);
        assert_eq!(state.report(&units).outcome, RunOutcome::Cancelled);

        let mut state: RunState<i32> = RunState::new(0);
        state.start();
        state.finish(RunPhase::Drained);
        assert!(state.report(&units).is_drained());
    }
}
