//! EmissionStrategy - what a receiver name resolves to

use std::time::Duration;

use async_trait::async_trait;
use contracts::{ContractError, EmissionReport, EmitterConfig, SinkFactory};
use emitter::PacedEmitter;
use tokio::sync::watch;

/// Backend-specific emission run
///
/// Object safe so strategies for different backends can share one registry.
#[async_trait]
pub trait EmissionStrategy: Send + Sync + 'static {
    /// Receiver name the strategy is registered under
    fn name(&self) -> &str;

    /// Emit `rate_per_minute` increments per tick until `duration` elapses
    async fn emit(
        &self,
        rate_per_minute: u64,
        duration: Duration,
    ) -> Result<EmissionReport, ContractError>;

    /// Like `emit`, stopping early once `shutdown` turns `true`
    ///
    /// Strategies without an early-stop path just run to the deadline.
    async fn emit_until(
        &self,
        rate_per_minute: u64,
        duration: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<EmissionReport, ContractError> {
        drop(shutdown);
        self.emit(rate_per_minute, duration).await
    }
}

/// Strategy backed by a [`PacedEmitter`] over any sink factory
pub struct PacedStrategy<F> {
    emitter: PacedEmitter<F>,
}

impl<F> PacedStrategy<F>
where
    F: SinkFactory + Sync + 'static,
{
    pub fn new(receiver: impl Into<String>, factory: F, config: EmitterConfig) -> Self {
        Self {
            emitter: PacedEmitter::new(receiver, factory, config),
        }
    }
}

#[async_trait]
impl<F> EmissionStrategy for PacedStrategy<F>
where
    F: SinkFactory + Sync + 'static,
{
    fn name(&self) -> &str {
        self.emitter.receiver()
    }

    async fn emit(
        &self,
        rate_per_minute: u64,
        duration: Duration,
    ) -> Result<EmissionReport, ContractError> {
        self.emitter.run(rate_per_minute, duration).await
    }

    async fn emit_until(
        &self,
        rate_per_minute: u64,
        duration: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<EmissionReport, ContractError> {
        self.emitter
            .run_until(rate_per_minute, duration, shutdown)
            .await
    }
}
