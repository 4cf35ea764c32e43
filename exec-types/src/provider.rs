use crate::cache::TechnicalSignals;
use crate::error::DataError;
use async_trait::async_trait;

/// Technical-indicator computation, consumed but not specified here.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    async fn fetch_signals(&self, ticker: &str) -> Result<TechnicalSignals, DataError>;
}

/// VIX/market-sentiment context, consumed but not specified here.
///
/// The engine tolerates `None` by substituting
/// [`crate::context::VIX_NEUTRAL_SENTINEL`] and continuing.
#[async_trait]
pub trait MarketContextProvider: Send + Sync {
    async fn vix(&self) -> Option<f64>;
}
