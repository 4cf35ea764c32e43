use chrono::Utc;
use exec_types::broker::BrokerPosition;
use exec_types::position::{ReconciliationSummary, TrackedPosition};
use exec_types::signal::Side;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use tracing::info;

/// Default bound on the closed-position history retained after a ticker
/// drops out of the broker's reported positions.
pub const DEFAULT_CLOSED_HISTORY: usize = 100;

/// Result of one [`PositionTracker::sync_from_broker`] pass: the summary
/// counts plus the positions that were just closed, so the caller (the
/// engine) can emit `position_closed` events for each.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    pub summary: ReconciliationSummary,
    pub closed: Vec<TrackedPosition>,
}

/// Mirror of broker positions enriched with local-only metadata.
///
/// Reconciliation tie-break: the broker is authoritative for `quantity` and
/// `avg_entry_price`; the tracker is authoritative for `strategy_name`,
/// `stop_loss`, `target`, `entry_order_id`, and `has_bracket_order`. A
/// ticker the broker reports but the tracker never recorded is admitted
/// with `strategy_name = "unknown"` and `has_bracket_order = false`.
#[derive(Debug, Default, Clone)]
pub struct PositionTracker {
    positions: HashMap<String, TrackedPosition>,
    closed_history: VecDeque<TrackedPosition>,
    closed_history_cap: usize,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            closed_history: VecDeque::new(),
            closed_history_cap: DEFAULT_CLOSED_HISTORY,
        }
    }

    pub fn from_entries(entries: Vec<TrackedPosition>) -> Self {
        let mut tracker = Self::new();
        for position in entries {
            tracker.positions.insert(position.ticker.clone(), position);
        }
        tracker
    }

    /// Reconcile local state against the broker's authoritative positions.
    pub fn sync_from_broker(&mut self, broker_positions: Vec<BrokerPosition>) -> SyncResult {
        let mut summary = ReconciliationSummary::default();
        let mut closed = Vec::new();

        let reported: HashMap<String, BrokerPosition> = broker_positions
            .into_iter()
            .map(|p| (p.ticker.clone(), p))
            .collect();

        for (ticker, broker_position) in &reported {
            match self.positions.get_mut(ticker) {
                Some(existing) => {
                    existing.quantity = broker_position.quantity;
                    existing.avg_entry_price = broker_position.avg_entry_price;
                    existing.reprice(broker_position.current_price);
                    summary.updated += 1;
                }
                None => {
                    let position = TrackedPosition {
                        ticker: ticker.clone(),
                        side: broker_position.side,
                        quantity: broker_position.quantity,
                        avg_entry_price: broker_position.avg_entry_price,
                        current_price: broker_position.current_price,
                        market_value: Decimal::ZERO,
                        unrealized_pnl: Decimal::ZERO,
                        unrealized_pnl_pct: Decimal::ZERO,
                        strategy_name: "unknown".to_string(),
                        opened_at: Utc::now(),
                        entry_order_id: String::new(),
                        stop_loss: None,
                        target: None,
                        has_bracket_order: false,
                        exit_attempts: 0,
                        last_exit_attempt: None,
                        notes: vec!["admitted from broker sync, no local record".to_string()],
                    };
                    let mut position = position;
                    position.reprice(broker_position.current_price);
                    self.positions.insert(ticker.clone(), position);
                    summary.added += 1;
                }
            }
        }

        let vanished: Vec<String> = self
            .positions
            .keys()
            .filter(|ticker| !reported.contains_key(*ticker))
            .cloned()
            .collect();

        for ticker in vanished {
            if let Some(position) = self.positions.remove(&ticker) {
                info!(ticker, strategy = %position.strategy_name, "position closed, vanished from broker sync");
                summary.removed += 1;
                self.closed_history.push_back(position.clone());
                while self.closed_history.len() > self.closed_history_cap {
                    self.closed_history.pop_front();
                }
                closed.push(position);
            }
        }

        SyncResult { summary, closed }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_position(
        &mut self,
        ticker: impl Into<String>,
        side: Side,
        quantity: i64,
        entry_price: Decimal,
        strategy_name: impl Into<String>,
        stop_loss: Option<Decimal>,
        target: Option<Decimal>,
        entry_order_id: impl Into<String>,
    ) {
        let ticker = ticker.into();
        let position = TrackedPosition::new(
            ticker.clone(),
            side,
            quantity,
            entry_price,
            strategy_name,
            stop_loss,
            target,
            entry_order_id,
            Utc::now(),
        );
        self.positions.insert(ticker, position);
    }

    pub fn get(&self, ticker: &str) -> Option<&TrackedPosition> {
        self.positions.get(ticker)
    }

    pub fn get_mut(&mut self, ticker: &str) -> Option<&mut TrackedPosition> {
        self.positions.get_mut(ticker)
    }

    pub fn has(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn all(&self) -> impl Iterator<Item = &TrackedPosition> {
        self.positions.values()
    }

    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn total_value(&self) -> Decimal {
        self.positions.values().map(|p| p.market_value).sum()
    }

    pub fn total_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }

    pub fn update_price(&mut self, ticker: &str, price: Decimal) {
        if let Some(position) = self.positions.get_mut(ticker) {
            position.reprice(price);
        }
    }

    pub fn closed_history(&self) -> impl Iterator<Item = &TrackedPosition> {
        self.closed_history.iter()
    }

    pub fn snapshot(&self) -> Vec<TrackedPosition> {
        self.positions.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker_pos(ticker: &str, side: Side, qty: i64, entry: Decimal, price: Decimal) -> BrokerPosition {
        BrokerPosition {
            ticker: ticker.to_string(),
            side,
            quantity: qty,
            avg_entry_price: entry,
            current_price: price,
        }
    }

    #[test]
    fn short_pnl_is_positive_on_price_drop() {
        let mut tracker = PositionTracker::new();
        tracker.add_position(
            "GME",
            Side::Short,
            100,
            Decimal::new(150, 0),
            "momentum",
            Some(Decimal::new(160, 0)),
            Some(Decimal::new(130, 0)),
            "order-1",
        );
        tracker.update_price("GME", Decimal::new(140, 0));
        let position = tracker.get("GME").unwrap();
        assert_eq!(position.unrealized_pnl, Decimal::new(1000, 0));
        assert!((position.unrealized_pnl_pct - Decimal::new(667, 4)).abs() < Decimal::new(1, 3));
    }

    #[test]
    fn sync_admits_unknown_broker_positions() {
        let mut tracker = PositionTracker::new();
        let result = tracker.sync_from_broker(vec![broker_pos(
            "AAPL",
            Side::Long,
            10,
            Decimal::new(100, 0),
            Decimal::new(105, 0),
        )]);
        assert_eq!(result.summary.added, 1);
        let position = tracker.get("AAPL").unwrap();
        assert_eq!(position.strategy_name, "unknown");
        assert!(!position.has_bracket_order);
    }

    #[test]
    fn sync_closes_vanished_positions() {
        let mut tracker = PositionTracker::new();
        tracker.add_position(
            "MSFT",
            Side::Long,
            10,
            Decimal::new(300, 0),
            "breakout",
            Some(Decimal::new(290, 0)),
            Some(Decimal::new(320, 0)),
            "order-1",
        );
        let result = tracker.sync_from_broker(vec![]);
        assert_eq!(result.summary.removed, 1);
        assert_eq!(result.closed.len(), 1);
        assert!(!tracker.has("MSFT"));
        assert_eq!(tracker.closed_history().count(), 1);
    }

    #[test]
    fn broker_is_authoritative_for_quantity_and_entry() {
        let mut tracker = PositionTracker::new();
        tracker.add_position(
            "NVDA",
            Side::Long,
            10,
            Decimal::new(500, 0),
            "momentum",
            Some(Decimal::new(480, 0)),
            Some(Decimal::new(550, 0)),
            "order-1",
        );
        tracker.sync_from_broker(vec![broker_pos(
            "NVDA",
            Side::Long,
            12,
            Decimal::new(495, 0),
            Decimal::new(510, 0),
        )]);
        let position = tracker.get("NVDA").unwrap();
        assert_eq!(position.quantity, 12);
        assert_eq!(position.avg_entry_price, Decimal::new(495, 0));
        assert_eq!(position.strategy_name, "momentum");
        assert!(position.has_bracket_order);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn broker_pos(qty: i64, entry_cents: i64, price_cents: i64) -> BrokerPosition {
        BrokerPosition {
            ticker: "PLTR".to_string(),
            side: Side::Long,
            quantity: qty,
            avg_entry_price: Decimal::new(entry_cents, 2),
            current_price: Decimal::new(price_cents, 2),
        }
    }

    proptest! {
        /// Whatever quantity/price the broker reports, the locally tracked
        /// strategy and bracket metadata never change: only `quantity`,
        /// `avg_entry_price`, and the repriced fields move.
        #[test]
        fn reconciliation_never_overwrites_local_authoritative_fields(
            qty in 1i64..10_000,
            entry_cents in 100i64..100_000,
            price_cents in 100i64..100_000,
        ) {
            let mut tracker = PositionTracker::new();
            tracker.add_position(
                "PLTR",
                Side::Long,
                5,
                Decimal::new(2000, 2),
                "breakout",
                Some(Decimal::new(1900, 2)),
                Some(Decimal::new(2200, 2)),
                "order-xyz",
            );

            tracker.sync_from_broker(vec![broker_pos(qty, entry_cents, price_cents)]);

            let position = tracker.get("PLTR").unwrap();
            prop_assert_eq!(position.quantity, qty);
            prop_assert_eq!(position.avg_entry_price, Decimal::new(entry_cents, 2));
            prop_assert_eq!(&position.strategy_name, "breakout");
            prop_assert_eq!(&position.entry_order_id, "order-xyz");
            prop_assert_eq!(position.stop_loss, Some(Decimal::new(1900, 2)));
            prop_assert_eq!(position.target, Some(Decimal::new(2200, 2)));
        }

        /// Closed history is bounded no matter how many positions churn
        /// through the tracker.
        #[test]
        fn closed_history_never_exceeds_its_cap(cycles in 0usize..250) {
            let mut tracker = PositionTracker::new();
            for i in 0..cycles {
                tracker.add_position(
                    format!("T{i}"),
                    Side::Long,
                    1,
                    Decimal::new(100, 0),
                    "momentum",
                    None,
                    None,
                    format!("order-{i}"),
                );
                tracker.sync_from_broker(vec![]);
            }
            prop_assert!(tracker.closed_history().count() <= DEFAULT_CLOSED_HISTORY);
        }
    }
}
