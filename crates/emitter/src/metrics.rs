//! Run counters shared between the pacing loop and fan-out tasks

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single emission run
#[derive(Debug, Default)]
pub struct EmitterMetrics {
    /// Ticks handled
    ticks: AtomicU64,
    /// Increment tasks spawned
    scheduled: AtomicU64,
    /// Increments accepted by the sink
    sent: AtomicU64,
    /// Increments the sink rejected (or whose task panicked)
    failed: AtomicU64,
    /// Increments cancelled at the drain timeout
    aborted: AtomicU64,
}

impl EmitterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }

    pub fn add_scheduled(&self, count: u64) {
        self.scheduled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn inc_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments spawned but not yet settled
    pub fn in_flight(&self) -> u64 {
        self.scheduled()
            .saturating_sub(self.sent() + self.failed() + self.aborted())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks(),
            scheduled: self.scheduled(),
            sent: self.sent(),
            failed: self.failed(),
            aborted: self.aborted(),
        }
    }
}

/// Point-in-time copy of [`EmitterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub scheduled: u64,
    pub sent: u64,
    pub failed: u64,
    pub aborted: u64,
}
