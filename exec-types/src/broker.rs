use crate::context::MarketStatus;
use crate::error::BrokerError;
use crate::signal::Side;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position as reported by the broker, before local enrichment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BrokerPosition {
    pub ticker: String,
    pub side: Side,
    pub quantity: i64,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
}

/// Opaque broker order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, derive_more::Display)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Filled,
    Rejected,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub ticker: String,
    pub kind: OrderEventKind,
    pub fill_price: Option<Decimal>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AccountSnapshot {
    pub equity: Decimal,
    pub buying_power: Decimal,
    pub day_trading_buying_power: Decimal,
    pub margin_requirement: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarketClock {
    pub status: MarketStatus,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}

/// The broker capability contract the execution core consumes.
///
/// Out of scope to implement here: this is the seam a live Alpaca/IBKR/etc.
/// adapter plugs into. The engine never depends on a concrete broker, only
/// on this trait.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn list_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    async fn submit_bracket(
        &self,
        ticker: &str,
        side: Side,
        quantity: i64,
        entry_price: Decimal,
        stop_loss: Decimal,
        target: Decimal,
    ) -> Result<OrderId, BrokerError>;

    async fn close_position(&self, ticker: &str) -> Result<OrderId, BrokerError>;

    async fn cancel_order(&self, order_id: &OrderId) -> Result<(), BrokerError>;

    async fn poll_order_updates(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, BrokerError>;

    async fn account(&self) -> Result<AccountSnapshot, BrokerError>;

    async fn market_clock(&self) -> Result<MarketClock, BrokerError>;
}
