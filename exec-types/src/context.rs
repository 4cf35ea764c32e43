use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Broker market clock phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketStatus {
    Open,
    PreMarket,
    AfterHours,
    Closed,
}

/// Sentinel substituted when the VIX provider returns `None`, so the engine
/// never blocks a cycle on a missing market-context value.
pub const VIX_NEUTRAL_SENTINEL: f64 = 20.0;

/// Point-in-time context handed to a strategy's entry/exit evaluation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketContext {
    pub vix: f64,
    pub market_status: MarketStatus,
    pub account_equity: Decimal,
    pub buying_power: Decimal,
    pub existing_positions: HashSet<String>,
    pub cooldown_tickers: HashSet<String>,
}

impl MarketContext {
    /// The common pre-filter every strategy's entry path is subject to
    /// before strategy-specific logic runs.
    pub fn passes_common_entry_prefilter(&self, ticker: &str) -> Option<&'static str> {
        if self.market_status != MarketStatus::Open {
            return Some("market_closed");
        }
        if self.existing_positions.contains(ticker) {
            return Some("already_positioned");
        }
        if self.cooldown_tickers.contains(ticker) {
            return Some("cooldown_active");
        }
        None
    }
}
