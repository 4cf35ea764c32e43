use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One OHLCV bar of the recent price history behind a [`TechnicalSignals`]
/// lookup. Most recent bar last.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bar {
    pub high: rust_decimal::Decimal,
    pub low: rust_decimal::Decimal,
    pub close: rust_decimal::Decimal,
    pub volume: u64,
}

/// Technical signals fetched from the (out-of-scope) signal provider.
///
/// Opaque to the queue and tracker; only strategies interpret the fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TechnicalSignals {
    pub symbol: String,
    pub price: rust_decimal::Decimal,
    pub atr: f64,
    pub momentum: f64,
    pub score: f64,
    pub signals: Vec<String>,
    /// Recent OHLCV history, oldest first, used by pattern-detecting
    /// (autonomous-mode) strategies such as Breakout and Mean-Reversion.
    pub bars: Vec<Bar>,
}

/// A cached [`TechnicalSignals`] with its fetch time and TTL.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSignal {
    pub signal: TechnicalSignals,
    pub timestamp: DateTime<Utc>,
    pub ttl: Duration,
}

impl CachedSignal {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (now - self.timestamp).to_std() {
            Ok(age) => age <= self.ttl,
            Err(_) => true,
        }
    }
}
