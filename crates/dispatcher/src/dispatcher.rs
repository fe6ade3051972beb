//! Dispatcher - runs the strategy registered for a receiver

use std::time::Duration;

use contracts::{
    DispatcherSettings, EmissionReport, EmissionRequest, LoadgenConfig, UnknownReceiverPolicy,
};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::collector::ErrorCollector;
use crate::error::DispatcherError;
use crate::registry::StrategyRegistry;

/// Maps receiver names to strategies and runs them to completion
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: StrategyRegistry,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(registry: StrategyRegistry, settings: DispatcherSettings) -> Self {
        Self { registry, settings }
    }

    /// Dispatcher with the built-in receivers
    pub fn from_config(config: &LoadgenConfig) -> Self {
        Self::new(StrategyRegistry::with_defaults(config), config.dispatcher)
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Run the request's strategy in its own task and wait for it
    ///
    /// Returns `Ok(None)` for an unregistered receiver under the ignore
    /// policy; nothing is scheduled in that case.
    pub async fn dispatch(
        &self,
        request: EmissionRequest,
    ) -> Result<Option<EmissionReport>, DispatcherError> {
        // A dropped sender never signals.
        let (_, shutdown) = watch::channel(false);
        self.dispatch_until(request, shutdown).await
    }

    /// [`dispatch`](Self::dispatch) with a graceful stop
    ///
    /// Once `shutdown` turns `true` the strategy stops ticking, drains and
    /// releases its sink, and the partial report is returned. Dropping the
    /// returned future instead aborts the task without releasing anything.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, request, shutdown),
        fields(
            receiver = %request.receiver,
            rate_per_minute = request.rate_per_minute,
            duration_ms = request.duration.as_millis() as u64
        )
    )]
    pub async fn dispatch_until(
        &self,
        request: EmissionRequest,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Option<EmissionReport>, DispatcherError> {
        let Some(strategy) = self.registry.get(&request.receiver) else {
            return match self.settings.unknown_receiver {
                UnknownReceiverPolicy::Ignore => {
                    warn!(
                        receiver = %request.receiver,
                        known = ?self.registry.receivers(),
                        "Unknown receiver, nothing to emit"
                    );
                    Ok(None)
                }
                UnknownReceiverPolicy::Reject => {
                    Err(DispatcherError::unknown_receiver(request.receiver))
                }
            };
        };

        let EmissionRequest {
            receiver,
            duration,
            rate_per_minute,
        } = request;

        // Dropping the set aborts the run if the caller gives up on it.
        let mut tasks = JoinSet::new();
        tasks.spawn(async move {
            strategy
                .emit_until(rate_per_minute, duration, shutdown)
                .await
        });
        debug!(receiver = %receiver, "Emission task spawned");

        let mut collector = ErrorCollector::new();
        let mut report = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => report = collector.record(result),
                Err(e) => collector.push(DispatcherError::task_failed(&receiver, e.to_string())),
            }
        }

        collector.finish()?;
        info!(receiver = %receiver, "Emission run complete");
        Ok(report)
    }

    /// Run and drop the report
    pub async fn run(
        &self,
        receiver: &str,
        duration: Duration,
        rate_per_minute: u64,
    ) -> Result<(), DispatcherError> {
        self.dispatch(EmissionRequest::new(receiver, duration, rate_per_minute))
            .await
            .map(|_| ())
    }
}

/// Generate `metrics_per_minute` increments per minute against `receiver`
/// for `duration`, using the built-in configuration.
///
/// Blocks (asynchronously) for the whole duration. Unknown receivers
/// succeed immediately without emitting.
pub async fn start_sending_metrics(
    receiver: &str,
    duration: Duration,
    metrics_per_minute: u64,
) -> Result<(), DispatcherError> {
    Dispatcher::from_config(&LoadgenConfig::default())
        .run(receiver, duration, metrics_per_minute)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contracts::{ContractError, EmitterConfig};
    use emitter::RecordingConnector;
    use tokio::time::Instant;

    use crate::strategy::{EmissionStrategy, PacedStrategy};

    fn recording_dispatcher(
        connector: RecordingConnector,
        policy: UnknownReceiverPolicy,
    ) -> Dispatcher {
        let mut registry = StrategyRegistry::new();
        registry.register(PacedStrategy::new(
            "statsd",
            connector,
            EmitterConfig::default(),
        ));
        Dispatcher::new(
            registry,
            DispatcherSettings {
                unknown_receiver: policy,
            },
        )
    }

    struct PanickingStrategy;

    #[async_trait]
    impl EmissionStrategy for PanickingStrategy {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn emit(
            &self,
            _rate_per_minute: u64,
            _duration: Duration,
        ) -> Result<EmissionReport, ContractError> {
            panic!("strategy blew up");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_runs_matched_strategy() {
        let connector = RecordingConnector::new();
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, UnknownReceiverPolicy::Ignore);

        let started = Instant::now();
        let report = dispatcher
            .dispatch(EmissionRequest::new("statsd", Duration::from_secs(65), 10))
            .await
            .unwrap()
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(65));
        assert_eq!(report.ticks, 1);
        assert_eq!(state.record_count(), 10);
        assert_eq!(state.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_receiver_is_immediate_noop() {
        let connector = RecordingConnector::new();
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, UnknownReceiverPolicy::Ignore);

        let started = Instant::now();
        let result = dispatcher
            .run("statd", Duration::from_secs(3600), 1000)
            .await;

        assert!(result.is_ok());
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(state.opened(), 0);
    }

    #[tokio::test]
    async fn test_unknown_receiver_rejected_when_strict() {
        let dispatcher =
            recording_dispatcher(RecordingConnector::new(), UnknownReceiverPolicy::Reject);

        let err = dispatcher
            .run("statd", Duration::from_secs(1), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::UnknownReceiver { ref receiver } if receiver == "statd"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_error_is_forwarded() {
        let connector = RecordingConnector::failing("connection refused");
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, UnknownReceiverPolicy::Ignore);

        let err = dispatcher
            .run("statsd", Duration::from_secs(65), 10)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatcherError::Emission(ContractError::SinkConnection { .. })
        ));
        assert_eq!(state.attempts(), 0);
    }

    #[tokio::test]
    async fn test_panicking_strategy_becomes_error() {
        let mut registry = StrategyRegistry::new();
        registry.register(PanickingStrategy);
        let dispatcher = Dispatcher::new(registry, DispatcherSettings::default());

        let err = dispatcher
            .run("panicky", Duration::from_secs(1), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::TaskFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_until_shutdown_returns_partial_report() {
        let connector = RecordingConnector::new();
        let state = connector.state();
        let dispatcher = recording_dispatcher(connector, UnknownReceiverPolicy::Ignore);
        let (stop, shutdown) = watch::channel(false);

        let (report, _) = tokio::join!(
            dispatcher.dispatch_until(
                EmissionRequest::new("statsd", Duration::from_secs(3_600), 5),
                shutdown,
            ),
            async move {
                tokio::time::sleep(Duration::from_secs(130)).await;
                stop.send(true).unwrap();
            }
        );

        let report = report.unwrap().unwrap();
        assert_eq!(report.ticks, 2);
        assert_eq!(state.record_count(), 10);
        assert_eq!(state.flushed(), 1);
        assert_eq!(state.closed(), 1);
    }

    #[tokio::test]
    async fn test_start_sending_metrics_zero_duration() {
        // UDP needs no listener; the sink is still opened and released.
        let result = start_sending_metrics("statsd", Duration::ZERO, 0).await;
        assert!(result.is_ok());

        let result = start_sending_metrics("does-not-exist", Duration::from_secs(60), 10).await;
        assert!(result.is_ok());
    }
}
