//! # Emitter
//!
//! Rate-paced counter emission against a metrics transport.
//!
//! Responsibilities:
//! - Own one sink per run (acquire, share with fan-out tasks, release)
//! - Fire a batch of increments on every tick until the deadline
//! - Join outstanding increments before the sink is released

pub mod emitter;
mod fanout;
pub mod metrics;
pub mod sinks;

pub use contracts::{CounterRecord, EmissionReport, MetricSink, SinkFactory};
pub use emitter::PacedEmitter;
pub use metrics::{EmitterMetrics, MetricsSnapshot};
pub use sinks::{
    LogConnector, LogSink, RecordingConnector, RecordingSink, RecordingState, StatsdConnector,
    StatsdSink,
};
