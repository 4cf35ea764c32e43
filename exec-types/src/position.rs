use crate::signal::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position mirrored from the broker, enriched with the metadata the
/// broker itself does not track (strategy, bracket legs, exit attempts).
///
/// Reconciliation tie-break: the broker is authoritative for `quantity` and
/// `avg_entry_price`; this side is authoritative for `strategy_name`,
/// `stop_loss`, `target`, `entry_order_id`, and `has_bracket_order`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrackedPosition {
    pub ticker: String,
    pub side: Side,
    pub quantity: i64,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub strategy_name: String,
    pub opened_at: DateTime<Utc>,
    pub entry_order_id: String,
    pub stop_loss: Option<Decimal>,
    pub target: Option<Decimal>,
    pub has_bracket_order: bool,
    pub exit_attempts: u32,
    pub last_exit_attempt: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
}

impl TrackedPosition {
    pub fn new(
        ticker: impl Into<String>,
        side: Side,
        quantity: i64,
        entry_price: Decimal,
        strategy_name: impl Into<String>,
        stop_loss: Option<Decimal>,
        target: Option<Decimal>,
        entry_order_id: impl Into<String>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let mut position = Self {
            ticker: ticker.into(),
            side,
            quantity,
            avg_entry_price: entry_price,
            current_price: entry_price,
            market_value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            strategy_name: strategy_name.into(),
            opened_at,
            entry_order_id: entry_order_id.into(),
            stop_loss,
            target,
            has_bracket_order: true,
            exit_attempts: 0,
            last_exit_attempt: None,
            notes: Vec::new(),
        };
        position.reprice(entry_price);
        position
    }

    /// Recompute `market_value`, `unrealized_pnl`, and `unrealized_pnl_pct`
    /// for a new `current_price`.
    ///
    /// Long positions profit when price rises, short positions profit when
    /// price falls.
    pub fn reprice(&mut self, current_price: Decimal) {
        self.current_price = current_price;
        let quantity = Decimal::from(self.quantity);
        self.market_value = current_price * quantity;

        self.unrealized_pnl = match self.side {
            Side::Long => (current_price - self.avg_entry_price) * quantity,
            Side::Short => (self.avg_entry_price - current_price) * quantity,
        };

        let invested = self.avg_entry_price * quantity;
        self.unrealized_pnl_pct = if invested.is_zero() {
            Decimal::ZERO
        } else {
            self.unrealized_pnl / invested
        };
    }
}

/// Delta summary returned by a broker reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}
