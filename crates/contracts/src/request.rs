//! EmissionRequest / EmissionReport - input and summary of one run

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::StatsSummary;

/// Caller input for one emission run
///
/// `Duration` and `u64` rule out negative spans and rates. A rate of zero
/// is a valid run that emits nothing until the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionRequest {
    /// Receiver (backend) name, e.g. "statsd"
    pub receiver: String,

    /// Wall-clock span of the run
    pub duration: Duration,

    /// Increments issued per tick
    pub rate_per_minute: u64,
}

impl EmissionRequest {
    pub fn new(receiver: impl Into<String>, duration: Duration, rate_per_minute: u64) -> Self {
        Self {
            receiver: receiver.into(),
            duration,
            rate_per_minute,
        }
    }
}

/// Summary of a finished emission run
///
/// Purely observational: per-increment failures show up here but never
/// turn the run into an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionReport {
    /// Receiver the run was executed for
    pub receiver: String,

    /// Ticks handled before the deadline
    pub ticks: u64,

    /// Increment tasks spawned
    pub increments_scheduled: u64,

    /// Increments accepted by the sink
    pub increments_sent: u64,

    /// Increments the sink rejected
    pub increments_failed: u64,

    /// Increments still in flight when the drain timeout expired
    pub increments_aborted: u64,

    /// Wall-clock time from sink acquisition to release
    pub elapsed: Duration,

    /// Per-increment sink latency (milliseconds)
    pub increment_latency_ms: StatsSummary,
}

impl EmissionReport {
    /// Increments that reached a terminal state (sent or failed)
    pub fn increments_completed(&self) -> u64 {
        self.increments_sent + self.increments_failed
    }

    /// Effective increments per second over the run
    pub fn throughput(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.increments_sent as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
