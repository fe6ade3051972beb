//! LogSink - logs each increment via tracing
//!
//! Backs the "log" receiver: a dry run that exercises pacing without a
//! network endpoint.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use contracts::{ContractError, CounterRecord, MetricSink, SinkFactory};
use tracing::{debug, info, instrument};

/// Opens [`LogSink`]s
#[derive(Debug, Clone)]
pub struct LogConnector {
    name: String,
}

impl LogConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SinkFactory for LogConnector {
    type Sink = LogSink;

    async fn open(&self) -> Result<LogSink, ContractError> {
        Ok(LogSink::new(&self.name))
    }
}

/// Sink that logs increments for debugging
#[derive(Debug)]
pub struct LogSink {
    name: String,
    count: AtomicU64,
    closed: AtomicBool,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Increments logged so far
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl MetricSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn increment(&self, record: &CounterRecord) -> Result<(), ContractError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ContractError::sink_closed(&self.name));
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        debug!(
            sink = %self.name,
            metric = %record.name,
            delta = record.delta,
            sample_rate = record.sample_rate,
            "Counter increment"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        self.closed.store(true, Ordering::Release);
        info!(sink = %self.name, increments = self.count(), "LogSink closed");
        Ok(())
    }
}
