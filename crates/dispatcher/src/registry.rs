//! StrategyRegistry - receiver name -> emission strategy

use std::collections::HashMap;
use std::sync::Arc;

use contracts::LoadgenConfig;
use emitter::{LogConnector, StatsdConnector};

use crate::strategy::{EmissionStrategy, PacedStrategy};

/// Receiver name of the statsd backend
pub const STATSD_RECEIVER: &str = "statsd";

/// Receiver name of the tracing-only dry run
pub const LOG_RECEIVER: &str = "log";

/// Registered strategies, keyed by receiver name
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn EmissionStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in receivers configured from `config`
    pub fn with_defaults(config: &LoadgenConfig) -> Self {
        let mut registry = Self::new();
        registry.register(PacedStrategy::new(
            STATSD_RECEIVER,
            StatsdConnector::new(config.statsd.clone()),
            config.emitter.clone(),
        ));
        registry.register(PacedStrategy::new(
            LOG_RECEIVER,
            LogConnector::new(LOG_RECEIVER),
            config.emitter.clone(),
        ));
        registry
    }

    /// Register under the strategy's own name, returning any strategy it replaced
    pub fn register(
        &mut self,
        strategy: impl EmissionStrategy,
    ) -> Option<Arc<dyn EmissionStrategy>> {
        let name = strategy.name().to_string();
        self.strategies.insert(name, Arc::new(strategy))
    }

    /// Register a shared strategy under an explicit receiver name
    pub fn register_as(
        &mut self,
        receiver: impl Into<String>,
        strategy: Arc<dyn EmissionStrategy>,
    ) -> Option<Arc<dyn EmissionStrategy>> {
        self.strategies.insert(receiver.into(), strategy)
    }

    pub fn get(&self, receiver: &str) -> Option<Arc<dyn EmissionStrategy>> {
        self.strategies.get(receiver).cloned()
    }

    pub fn contains(&self, receiver: &str) -> bool {
        self.strategies.contains_key(receiver)
    }

    /// Registered receiver names, sorted
    pub fn receivers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("receivers", &self.receivers())
            .finish()
    }
}
