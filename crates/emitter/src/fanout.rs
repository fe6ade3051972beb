//! Increment fan-out for one run
//!
//! Every tick spawns its batch into a single `JoinSet` without awaiting it.
//! A semaphore bounds how many increments talk to the sink at once; the
//! permit is taken inside the task so the pacing loop never blocks on it.
//! Outstanding tasks are joined (or aborted after a grace period) before
//! the sink is released.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

use contracts::{ContractError, CounterRecord, MetricSink, RunningStats};

use crate::metrics::EmitterMetrics;

/// Sink latency of one increment and its result
type IncrementOutcome = (Duration, Result<(), ContractError>);

pub(crate) struct FanOut<S> {
    receiver: String,
    sink: Arc<S>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<IncrementOutcome>,
    metrics: Arc<EmitterMetrics>,
    latency_ms: RunningStats,
}

impl<S> FanOut<S>
where
    S: MetricSink + Sync + 'static,
{
    pub(crate) fn new(
        receiver: impl Into<String>,
        sink: Arc<S>,
        max_in_flight: usize,
        metrics: Arc<EmitterMetrics>,
    ) -> Self {
        Self {
            receiver: receiver.into(),
            sink,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            tasks: JoinSet::new(),
            metrics,
            latency_ms: RunningStats::default(),
        }
    }

    /// Spawn one increment per index in `0..batch_size`
    pub(crate) fn spawn_batch(&mut self, batch_size: u64) {
        for index in 0..batch_size {
            let sink = Arc::clone(&self.sink);
            let permits = Arc::clone(&self.permits);

            self.tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (
                            Duration::ZERO,
                            Err(ContractError::Other(format!("fan-out permits closed: {e}"))),
                        )
                    }
                };

                let record = CounterRecord::for_index(index);
                let started = Instant::now();
                let result = sink.increment(&record).await;
                (started.elapsed(), result)
            });
        }

        self.metrics.add_scheduled(batch_size);
    }

    /// Settle tasks that already finished, without waiting
    pub(crate) fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.settle(joined);
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Join every outstanding increment, aborting whatever is left after `timeout`
    pub(crate) async fn drain(&mut self, timeout: Duration) {
        let expiry = Instant::now() + timeout;

        loop {
            match tokio::time::timeout_at(expiry, self.tasks.join_next()).await {
                Ok(Some(joined)) => self.settle(joined),
                Ok(None) => return,
                Err(_) => break,
            }
        }

        warn!(
            receiver = %self.receiver,
            outstanding = self.tasks.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Drain timeout expired, aborting outstanding increments"
        );

        let aborted_before = self.metrics.aborted();
        self.tasks.abort_all();
        while let Some(joined) = self.tasks.join_next().await {
            self.settle(joined);
        }
        observability::record_aborted(&self.receiver, self.metrics.aborted() - aborted_before);
    }

    pub(crate) fn latency_ms(&self) -> &RunningStats {
        &self.latency_ms
    }

    fn settle(&mut self, joined: Result<IncrementOutcome, JoinError>) {
        match joined {
            Ok((latency, Ok(()))) => {
                let latency_ms = latency.as_secs_f64() * 1000.0;
                self.metrics.inc_sent();
                self.latency_ms.push(latency_ms);
                observability::record_increment(&self.receiver, true, latency_ms);
            }
            Ok((latency, Err(e))) => {
                // Transport failures are counted, never propagated.
                self.metrics.inc_failed();
                debug!(receiver = %self.receiver, error = %e, "Increment failed");
                observability::record_increment(
                    &self.receiver,
                    false,
                    latency.as_secs_f64() * 1000.0,
                );
            }
            Err(e) if e.is_cancelled() => {
                self.metrics.inc_aborted();
            }
            Err(e) => {
                self.metrics.inc_failed();
                warn!(receiver = %self.receiver, error = ?e, "Increment task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::RecordingConnector;
    use contracts::SinkFactory;

    #[tokio::test]
    async fn test_batch_values_and_drain() {
        let connector = RecordingConnector::new();
        let sink = Arc::new(connector.open().await.unwrap());
        let metrics = Arc::new(EmitterMetrics::new());
        let mut fanout = FanOut::new("test", sink, 4, Arc::clone(&metrics));

        fanout.spawn_batch(10);
        fanout.drain(Duration::from_secs(1)).await;

        assert_eq!(fanout.in_flight(), 0);
        assert_eq!(metrics.sent(), 10);
        assert_eq!(fanout.latency_ms().count(), 10);

        let mut values = connector.state().values();
        values.sort_unstable();
        assert_eq!(values, (0..10).collect::<Vec<i64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_timeout_aborts_slow_increments() {
        let connector = RecordingConnector::new().with_delay(Duration::from_secs(30));
        let sink = Arc::new(connector.open().await.unwrap());
        let metrics = Arc::new(EmitterMetrics::new());
        let mut fanout = FanOut::new("slow", sink, 16, Arc::clone(&metrics));

        fanout.spawn_batch(3);
        fanout.drain(Duration::from_secs(1)).await;

        assert_eq!(metrics.aborted(), 3);
        assert_eq!(metrics.sent(), 0);
        assert_eq!(connector.state().record_count(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let connector = RecordingConnector::new().with_failing_writes();
        let sink = Arc::new(connector.open().await.unwrap());
        let metrics = Arc::new(EmitterMetrics::new());
        let mut fanout = FanOut::new("failing", sink, 8, Arc::clone(&metrics));

        fanout.spawn_batch(5);
        fanout.drain(Duration::from_secs(1)).await;

        assert_eq!(metrics.failed(), 5);
        assert_eq!(metrics.sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_bound_concurrency() {
        let connector = RecordingConnector::new().with_delay(Duration::from_millis(100));
        let sink = Arc::new(connector.open().await.unwrap());
        let metrics = Arc::new(EmitterMetrics::new());
        let mut fanout = FanOut::new("bounded", sink, 2, Arc::clone(&metrics));

        fanout.spawn_batch(6);
        fanout.drain(Duration::from_secs(10)).await;

        assert_eq!(metrics.sent(), 6);
        assert_eq!(connector.state().max_concurrent(), 2);
    }
}
