//! Bracket order submission against a [`exec_types::broker::Broker`], with
//! bounded retry on transient failures and an analyze-mode dry run.

pub mod order_manager;
pub mod params;

pub use order_manager::{OrderError, OrderManager, RetryPolicy, SubmitOutcome};
pub use params::BracketOrderParams;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exec_types::broker::{AccountSnapshot, Broker, BrokerPosition, MarketClock, OrderEvent, OrderId};
    use exec_types::context::MarketStatus;
    use exec_types::error::BrokerError;
    use exec_types::signal::{Action, Side};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FlakyBroker {
        fail_times: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Broker for FlakyBroker {
        async fn list_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
            Ok(vec![])
        }

        async fn submit_bracket(
            &self,
            ticker: &str,
            _side: Side,
            _quantity: i64,
            _entry_price: Decimal,
            _stop_loss: Decimal,
            _target: Decimal,
        ) -> Result<OrderId, BrokerError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                return Err(BrokerError::Transient {
                    ticker: Some(ticker.to_string()),
                    message: "rate limited".to_string(),
                });
            }
            Ok(OrderId(format!("order-{ticker}")))
        }

        async fn close_position(&self, ticker: &str) -> Result<OrderId, BrokerError> {
            Ok(OrderId(format!("close-{ticker}")))
        }

        async fn cancel_order(&self, _order_id: &OrderId) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn poll_order_updates(&self, _since: chrono::DateTime<chrono::Utc>) -> Result<Vec<OrderEvent>, BrokerError> {
            Ok(vec![])
        }

        async fn account(&self) -> Result<AccountSnapshot, BrokerError> {
            Ok(AccountSnapshot {
                equity: Decimal::new(100_000, 0),
                buying_power: Decimal::new(50_000, 0),
                day_trading_buying_power: Decimal::new(50_000, 0),
                margin_requirement: Decimal::ZERO,
            })
        }

        async fn market_clock(&self) -> Result<MarketClock, BrokerError> {
            Ok(MarketClock {
                status: MarketStatus::Open,
                next_open: chrono::Utc::now(),
                next_close: chrono::Utc::now(),
            })
        }
    }

    fn params() -> BracketOrderParams {
        BracketOrderParams {
            ticker: "AAPL".to_string(),
            side: Action::Buy,
            quantity: 100,
            entry_price: Decimal::new(150, 0),
            stop_loss: Decimal::new(145, 0),
            target: Decimal::new(165, 0),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let broker = Arc::new(FlakyBroker {
            fail_times: 2,
            calls: AtomicU32::new(0),
        });
        let manager = OrderManager::new(broker, false)
            .with_retry_policy(RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) });

        let outcome = manager.submit_bracket_order(params()).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Submitted(OrderId("order-AAPL".to_string())));
    }

    #[tokio::test]
    async fn exhausts_retries_and_surfaces_error() {
        let broker = Arc::new(FlakyBroker {
            fail_times: 10,
            calls: AtomicU32::new(0),
        });
        let manager = OrderManager::new(broker, false)
            .with_retry_policy(RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) });

        let err = manager.submit_bracket_order(params()).await.unwrap_err();
        assert!(matches!(err, OrderError::Broker(BrokerError::Transient { .. })));
    }

    #[tokio::test]
    async fn analyze_mode_never_calls_broker() {
        let broker = Arc::new(FlakyBroker {
            fail_times: 0,
            calls: AtomicU32::new(0),
        });
        let manager = OrderManager::new(broker, true);
        let outcome = manager.submit_bracket_order(params()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::DryRun { .. }));
    }

    #[tokio::test]
    async fn rejects_invalid_params_without_calling_broker() {
        let broker = Arc::new(FlakyBroker {
            fail_times: 0,
            calls: AtomicU32::new(0),
        });
        let manager = OrderManager::new(broker, false);
        let mut bad = params();
        bad.stop_loss = Decimal::new(160, 0);
        let err = manager.submit_bracket_order(bad).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }
}
