//! CounterRecord - one counter increment as handed to a sink

use serde::{Deserialize, Serialize};

/// Sample rate meaning "always sampled"
pub const ALWAYS_SAMPLED: f32 = 1.0;

/// Counter-style metric record
///
/// Wire encoding is left to the sink; statsd renders it as `name:delta|c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Metric name (without any sink prefix)
    pub name: String,

    /// Increment amount
    pub delta: i64,

    /// Sample rate in (0, 1]
    pub sample_rate: f32,
}

impl CounterRecord {
    /// Create a new counter record
    pub fn new(name: impl Into<String>, delta: i64, sample_rate: f32) -> Self {
        Self {
            name: name.into(),
            delta,
            sample_rate,
        }
    }

    /// Record for position `index` within a tick's batch.
    ///
    /// Name is the stringified index, delta equals the index, always sampled.
    pub fn for_index(index: u64) -> Self {
        Self {
            name: index.to_string(),
            delta: i64::try_from(index).unwrap_or(i64::MAX),
            sample_rate: ALWAYS_SAMPLED,
        }
    }

    /// Whether the record bypasses statistical dropping
    pub fn is_always_sampled(&self) -> bool {
        self.sample_rate >= ALWAYS_SAMPLED
    }
}
