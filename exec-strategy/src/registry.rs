use crate::strategy::Strategy;
use exec_types::error::ValidationError;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-strategy parameter overrides, keyed by parameter name.
pub type StrategyConfigOverrides = HashMap<String, f64>;

type StrategyFactory = Arc<dyn Fn(Option<&StrategyConfigOverrides>) -> Arc<dyn Strategy> + Send + Sync>;

/// A named registry of strategy factories, injected into the engine at
/// construction rather than reached via an ambient singleton.
///
/// `get` returns a cached instance when `config` is omitted, constructing
/// and caching it on first request; passing an explicit `config` always
/// builds a fresh, uncached instance.
#[derive(Default)]
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
    cache: HashMap<String, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(Option<&StrategyConfigOverrides>) -> Arc<dyn Strategy> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn get(
        &mut self,
        name: &str,
        config: Option<&StrategyConfigOverrides>,
    ) -> Result<Arc<dyn Strategy>, ValidationError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ValidationError::UnknownStrategy(name.to_string()))?;

        if config.is_none() {
            if let Some(cached) = self.cache.get(name) {
                return Ok(Arc::clone(cached));
            }
        }

        let strategy = factory(config);

        if config.is_none() {
            self.cache.insert(name.to_string(), Arc::clone(&strategy));
        }

        Ok(strategy)
    }

    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}
