//! MetricSink / SinkFactory traits - transport interface
//!
//! A sink is opened once per run and shared by every concurrent increment
//! task of that run, so all methods take `&self`.

use crate::{ContractError, CounterRecord};

/// Metrics transport handle
///
/// Implementations must tolerate concurrent `increment` calls.
#[trait_variant::make(MetricSink: Send)]
pub trait LocalMetricSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Increment a counter
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn increment(&self, record: &CounterRecord) -> Result<(), ContractError>;

    /// Flush buffered data (if any)
    async fn flush(&self) -> Result<(), ContractError>;

    /// Release the sink; later increments fail with `SinkClosed`
    async fn close(&self) -> Result<(), ContractError>;
}

/// Acquisition of a sink
#[trait_variant::make(SinkFactory: Send)]
pub trait LocalSinkFactory {
    type Sink: MetricSink + Sync + 'static;

    /// Open a fresh sink
    ///
    /// # Errors
    /// Invalid configuration or unreachable endpoint
    async fn open(&self) -> Result<Self::Sink, ContractError>;
}
