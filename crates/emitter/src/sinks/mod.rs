//! Sink implementations
//!
//! Contains StatsdSink, LogSink, and the RecordingSink test double.

mod log;
mod recording;
mod statsd;

pub use self::log::{LogConnector, LogSink};
pub use self::recording::{RecordingConnector, RecordingSink, RecordingState};
pub use self::statsd::{StatsdConnector, StatsdSink};
