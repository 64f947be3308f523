//! Per-engine counters, readable without taking the coordination lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::deliberation::CycleOutcome;

#[derive(Debug, Default)]
pub struct LoopStats {
    cycles: AtomicU64,
    fired: AtomicU64,
    idle: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
    reflex_runs: AtomicU64,
    reflex_failures: AtomicU64,
}

/// Point-in-time copy of [`LoopStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    /// Cycles whose action completed successfully.
    pub fired: u64,
    /// Cycles with an empty conflict set.
    pub idle: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub reflex_runs: u64,
    pub reflex_failures: u64,
}

impl LoopStats {
    /// Count a new cycle and return its 1-based number.
    pub(crate) fn begin_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record(&self, outcome: &CycleOutcome) {
        let counter = match outcome {
            CycleOutcome::NoMatch => &self.idle,
            CycleOutcome::Fired { .. } => &self.fired,
            CycleOutcome::TimedOut { .. } => &self.timeouts,
            CycleOutcome::Failed { .. } => &self.failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reflex(&self, ok: bool) {
        self.reflex_runs.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.reflex_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            idle: self.idle.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            reflex_runs: self.reflex_runs.load(Ordering::Relaxed),
            reflex_failures: self.reflex_failures.load(Ordering::Relaxed),
        }
    }
}
