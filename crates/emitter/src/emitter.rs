//! PacedEmitter - fixed-rate, fixed-duration counter bursts
//!
//! Two timers race in one loop: a tick every `tick_interval` (first one a
//! full interval after start) and a one-shot deadline at `start + duration`.
//! Each tick fans out `rate_per_minute` increments without awaiting them.
//! The loop ends at the deadline or when shutdown is signalled; both are a
//! success and both still drain and release the sink.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ContractError, EmissionReport, EmitterConfig, MetricSink, SinkFactory, MAX_INTERVAL_MS,
};
use tokio::sync::watch;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::fanout::FanOut;
use crate::metrics::EmitterMetrics;

/// Drives one receiver's sink at a fixed rate until the deadline
pub struct PacedEmitter<F> {
    receiver: String,
    factory: F,
    config: EmitterConfig,
}

impl<F> PacedEmitter<F>
where
    F: SinkFactory + Sync,
{
    pub fn new(receiver: impl Into<String>, factory: F, config: EmitterConfig) -> Self {
        Self {
            receiver: receiver.into(),
            factory,
            config,
        }
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Run until `duration` has elapsed since the sink was acquired
    ///
    /// # Errors
    /// Only setup failures: invalid pacing configuration or sink acquisition.
    /// Per-increment transport errors are counted in the report instead.
    pub async fn run(
        &self,
        rate_per_minute: u64,
        duration: Duration,
    ) -> Result<EmissionReport, ContractError> {
        // A dropped sender never signals.
        let (_, shutdown) = watch::channel(false);
        self.run_until(rate_per_minute, duration, shutdown).await
    }

    /// Like [`run`](Self::run), but stops early once `shutdown` turns `true`
    ///
    /// An early stop still drains outstanding increments and releases the
    /// sink, so buffered lines are flushed and a report is returned.
    #[instrument(
        name = "paced_emitter_run",
        skip(self, shutdown),
        fields(receiver = %self.receiver, duration_ms = duration.as_millis() as u64)
    )]
    pub async fn run_until(
        &self,
        rate_per_minute: u64,
        duration: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<EmissionReport, ContractError> {
        self.validate()?;

        let sink = match self.factory.open().await {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                error!(receiver = %self.receiver, error = %e, "Sink acquisition failed");
                observability::record_run_failed(&self.receiver, "setup");
                return Err(e);
            }
        };

        observability::record_run_started(&self.receiver, rate_per_minute);
        info!(
            receiver = %self.receiver,
            sink = sink.name(),
            rate_per_minute,
            tick_ms = self.config.tick_interval_ms,
            "Emission started"
        );

        let started = Instant::now();
        let metrics = Arc::new(EmitterMetrics::new());
        let mut fanout = FanOut::new(
            self.receiver.clone(),
            Arc::clone(&sink),
            self.config.max_in_flight,
            Arc::clone(&metrics),
        );

        let deadline = deadline_after(started, duration);
        self.pace(&mut fanout, &metrics, rate_per_minute, started, deadline, shutdown)
            .await;
        fanout.drain(self.config.drain_timeout()).await;
        let latency_ms = fanout.latency_ms().summary();
        drop(fanout);

        Self::release(sink.as_ref()).await;

        let snapshot = metrics.snapshot();
        let report = EmissionReport {
            receiver: self.receiver.clone(),
            ticks: snapshot.ticks,
            increments_scheduled: snapshot.scheduled,
            increments_sent: snapshot.sent,
            increments_failed: snapshot.failed,
            increments_aborted: snapshot.aborted,
            elapsed: started.elapsed(),
            increment_latency_ms: latency_ms,
        };

        observability::record_run_finished(&report);
        info!(
            receiver = %self.receiver,
            ticks = report.ticks,
            sent = report.increments_sent,
            failed = report.increments_failed,
            aborted = report.increments_aborted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Emission finished"
        );

        Ok(report)
    }

    fn validate(&self) -> Result<(), ContractError> {
        if self.config.tick_interval_ms == 0 {
            return Err(ContractError::config_validation(
                "emitter.tick_interval_ms",
                "tick interval must be > 0",
            ));
        }
        if self.config.tick_interval_ms > MAX_INTERVAL_MS {
            return Err(ContractError::config_validation(
                "emitter.tick_interval_ms",
                format!("tick interval must be <= {MAX_INTERVAL_MS}"),
            ));
        }
        if self.config.max_in_flight == 0 {
            return Err(ContractError::config_validation(
                "emitter.max_in_flight",
                "max_in_flight must be > 0",
            ));
        }
        Ok(())
    }

    /// Tick/deadline loop
    ///
    /// Ticks are handled by their scheduled instant: one due at the same
    /// instant as the deadline is still handled, any later one ends the loop
    /// even if the batch before it overran the interval.
    async fn pace<S>(
        &self,
        fanout: &mut FanOut<S>,
        metrics: &EmitterMetrics,
        rate_per_minute: u64,
        started: Instant,
        deadline: Instant,
        shutdown: watch::Receiver<bool>,
    ) where
        S: MetricSink + Sync + 'static,
    {
        let tick = self.config.tick_interval();
        let first_tick = started.checked_add(tick).unwrap_or(deadline);
        let mut ticker = interval_at(first_tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let expired = sleep_until(deadline);
        tokio::pin!(expired);
        let stopped = shutdown_requested(shutdown);
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                biased;

                _ = &mut stopped => {
                    info!(receiver = %self.receiver, ticks = metrics.ticks(), "Shutdown requested, stopping early");
                    break;
                }

                scheduled = ticker.tick() => {
                    if scheduled > deadline {
                        debug!(receiver = %self.receiver, ticks = metrics.ticks(), "Deadline passed");
                        break;
                    }
                    metrics.inc_ticks();
                    fanout.spawn_batch(rate_per_minute);
                    fanout.reap();
                    observability::record_tick(&self.receiver, rate_per_minute);
                    debug!(
                        receiver = %self.receiver,
                        tick = metrics.ticks(),
                        batch = rate_per_minute,
                        in_flight = fanout.in_flight(),
                        "Tick"
                    );
                }

                _ = &mut expired => {
                    debug!(receiver = %self.receiver, ticks = metrics.ticks(), "Deadline reached");
                    break;
                }
            }
        }
    }

    /// Flush and close; failures are logged, never returned
    async fn release<S: MetricSink>(sink: &S) {
        if let Err(e) = sink.flush().await {
            warn!(sink = sink.name(), error = %e, "Flush failed on release");
        }
        if let Err(e) = sink.close().await {
            warn!(sink = sink.name(), error = %e, "Close failed on release");
        }
    }
}

/// `started + duration`, saturating to a far-future instant
fn deadline_after(started: Instant, duration: Duration) -> Instant {
    started
        .checked_add(duration)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

/// About thirty years; unreachable for any run
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Resolves once the flag turns `true`; never if the sender is gone first
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
