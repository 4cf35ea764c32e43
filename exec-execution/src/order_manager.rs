use crate::params::BracketOrderParams;
use chrono::{DateTime, Utc};
use exec_types::broker::{Broker, OrderEvent, OrderId};
use exec_types::error::{BrokerError, ValidationError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded exponential backoff applied to transient broker failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Outcome of a submission or close that may have been a dry run.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(OrderId),
    /// Analyze mode: no broker call was made. `order_id` is a locally
    /// generated placeholder so callers that key off an id (position
    /// tracking, logging) don't need a separate analyze-mode code path.
    DryRun { order_id: OrderId, description: String },
}

fn dry_run_order_id() -> OrderId {
    OrderId(format!("analyze-{}", uuid::Uuid::new_v4()))
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Submits bracket orders, closes, and cancels against a [`Broker`], with
/// bounded retry on transient failures and an analyze-mode dry run that
/// bypasses the broker entirely while preserving every other contract.
pub struct OrderManager {
    broker: Arc<dyn Broker>,
    analyze_mode: bool,
    retry: RetryPolicy,
    last_poll: DateTime<Utc>,
}

impl OrderManager {
    pub fn new(broker: Arc<dyn Broker>, analyze_mode: bool) -> Self {
        Self {
            broker,
            analyze_mode,
            retry: RetryPolicy::default(),
            last_poll: Utc::now(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn set_analyze_mode(&mut self, analyze_mode: bool) {
        self.analyze_mode = analyze_mode;
    }

    pub fn analyze_mode(&self) -> bool {
        self.analyze_mode
    }

    /// Submit a bracket order. In analyze mode, returns a synthetic
    /// "would-submit" result without calling the broker; all other
    /// contracts (tracking, cooldown, persistence) proceed in the caller as
    /// if the order had filled at the requested price.
    pub async fn submit_bracket_order(&self, params: BracketOrderParams) -> Result<SubmitOutcome, OrderError> {
        params.validate()?;

        if self.analyze_mode {
            return Ok(SubmitOutcome::DryRun {
                order_id: dry_run_order_id(),
                description: format!(
                    "would submit {:?} {} x{} @ {} (stop {}, target {})",
                    params.side, params.ticker, params.quantity, params.entry_price, params.stop_loss, params.target
                ),
            });
        }

        let order_id = self
            .with_retry(&params.ticker, || {
                let broker = Arc::clone(&self.broker);
                let params = params.clone();
                Box::pin(async move {
                    broker
                        .submit_bracket(
                            &params.ticker,
                            params.side.into(),
                            params.quantity,
                            params.entry_price,
                            params.stop_loss,
                            params.target,
                        )
                        .await
                })
            })
            .await?;

        Ok(SubmitOutcome::Submitted(order_id))
    }

    /// Cancel any open brackets for `ticker` and submit a closing order.
    ///
    /// `bypass_retry` skips backoff sleeps entirely (a single attempt), for
    /// an exit whose [`exec_types::decision::Urgency`] is `Immediate` and
    /// cannot afford to wait out a retry window.
    pub async fn close_position(&self, ticker: &str, bypass_retry: bool) -> Result<SubmitOutcome, OrderError> {
        if self.analyze_mode {
            return Ok(SubmitOutcome::DryRun {
                order_id: dry_run_order_id(),
                description: format!("would close {ticker}"),
            });
        }

        let policy = if bypass_retry {
            RetryPolicy { max_attempts: 1, ..self.retry }
        } else {
            self.retry
        };

        let ticker_owned = ticker.to_string();
        let order_id = Self::with_retry_policy_for(policy, ticker, || {
            let broker = Arc::clone(&self.broker);
            let ticker = ticker_owned.clone();
            Box::pin(async move { broker.close_position(&ticker).await })
        })
        .await?;

        Ok(SubmitOutcome::Submitted(order_id))
    }

    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<(), OrderError> {
        if self.analyze_mode {
            return Ok(());
        }
        self.broker.cancel_order(order_id).await?;
        Ok(())
    }

    /// Poll the broker for fill/rejection events since the last poll.
    pub async fn poll_orders(&mut self) -> Result<Vec<OrderEvent>, OrderError> {
        let since = self.last_poll;
        self.last_poll = Utc::now();
        if self.analyze_mode {
            return Ok(Vec::new());
        }
        Ok(self.broker.poll_order_updates(since).await?)
    }

    /// Retry a transient-failing broker call with bounded exponential
    /// backoff; persistent failures are not retried.
    async fn with_retry<'a, F>(&'a self, ticker: &str, call: F) -> Result<OrderId, BrokerError>
    where
        F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<OrderId, BrokerError>> + Send + 'a>>,
    {
        Self::with_retry_policy_for(self.retry, ticker, call).await
    }

    async fn with_retry_policy_for<'a, F>(policy: RetryPolicy, ticker: &str, mut call: F) -> Result<OrderId, BrokerError>
    where
        F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<OrderId, BrokerError>> + Send + 'a>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(order_id) => return Ok(order_id),
                Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                    let delay = policy.base_delay * 2u32.pow(attempt - 1);
                    warn!(ticker, attempt, ?delay, "transient broker error, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(ticker, attempt, "broker call exhausted retries or failed persistently");
                    return Err(err);
                }
            }
        }
    }
}
