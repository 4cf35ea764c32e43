use crate::cache::SignalCache;
use crate::config::EngineConfig;
use crate::persistence::{PersistedState, StateStore};
use crate::state::RunState;
use chrono::{DateTime, Duration, Utc};
use exec_execution::{BracketOrderParams, OrderError, OrderManager, SubmitOutcome};
use exec_queue::{RejectReason, SignalQueue};
use exec_risk::{CooldownManager, PositionTracker};
use exec_strategy::StrategyRegistry;
use exec_types::broker::{Broker, OrderEventKind};
use exec_types::context::{MarketContext, VIX_NEUTRAL_SENTINEL};
use exec_types::decision::Urgency;
use exec_types::event::{EngineEvent, EventSink};
use exec_types::provider::{MarketContextProvider, SignalProvider};
use exec_types::signal::{PendingSignal, Side};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Summary of one `run_cycle` invocation, returned for logging/testing; the
/// same counts drive the `cycle_complete` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub entries: usize,
    pub exits: usize,
    pub positions: usize,
    pub queue_size: usize,
    pub aborted_at_sync: bool,
}

/// Rejections at the admission boundary, before a signal ever reaches the
/// queue.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdmissionError {
    #[error("engine is not running")]
    NotRunning,
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),
    #[error(transparent)]
    Queue(#[from] RejectReason),
}

/// Orchestrates one admission queue, one position book, one cooldown set,
/// and the strategies registered against them into the fixed-interval
/// cycle described by `EngineConfig::check_interval`.
///
/// Single-writer by convention: `run_cycle`/`start`/`stop` and `add_signal`
/// all take `&mut self`. A caller driving the cycle loop concurrently with
/// signal admission is expected to hold the engine behind its own mutex,
/// with admission arriving over a channel into a single owned task.
pub struct ExecutionEngine {
    config: EngineConfig,
    broker: Arc<dyn Broker>,
    signal_provider: Arc<dyn SignalProvider>,
    market_provider: Arc<dyn MarketContextProvider>,
    orders: OrderManager,
    strategies: StrategyRegistry,
    queue: SignalQueue,
    positions: PositionTracker,
    cooldowns: CooldownManager,
    cache: SignalCache,
    events: EventSink,
    state_store: StateStore,
    run_state: RunState,
    active_strategy: String,
    recent_rejects: HashMap<String, Vec<DateTime<Utc>>>,
    state_loaded: bool,
}

impl ExecutionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        broker: Arc<dyn Broker>,
        signal_provider: Arc<dyn SignalProvider>,
        market_provider: Arc<dyn MarketContextProvider>,
        strategies: StrategyRegistry,
        default_strategy: impl Into<String>,
    ) -> Self {
        let orders = OrderManager::new(Arc::clone(&broker), config.analyze_mode);
        let state_store = StateStore::new(config.state_file_path.clone());
        let ttl = config
            .default_signal_ttl()
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60));

        Self {
            queue: SignalQueue::new(config.max_signals, config.default_signal_ttl()),
            positions: PositionTracker::new(),
            cooldowns: CooldownManager::new(),
            cache: SignalCache::new(ttl),
            events: EventSink::new(),
            state_store,
            run_state: RunState::Stopped,
            active_strategy: default_strategy.into(),
            recent_rejects: HashMap::new(),
            state_loaded: false,
            config,
            broker,
            signal_provider,
            market_provider,
            orders,
            strategies,
        }
    }

    pub fn on_event(&mut self, handler: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        self.events.register(handler);
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn start(&mut self) {
        self.run_state = RunState::Running;
    }

    /// Request a graceful stop: the in-flight or next `run_cycle` completes
    /// normally, then the caller should observe `run_state() == Stopped`.
    pub fn stop(&mut self) {
        if self.run_state == RunState::Running {
            self.run_state = RunState::Draining;
        }
    }

    pub fn set_analyze_mode(&mut self, analyze_mode: bool) {
        self.config.analyze_mode = analyze_mode;
        self.orders.set_analyze_mode(analyze_mode);
    }

    pub fn set_strategy(&mut self, name: impl Into<String>) {
        self.active_strategy = name.into();
    }

    pub async fn reset_state(&mut self) -> Result<(), crate::persistence::StateError> {
        self.queue = SignalQueue::new(self.config.max_signals, self.config.default_signal_ttl());
        self.positions = PositionTracker::new();
        self.cooldowns = CooldownManager::new();
        self.cache.clear();
        self.state_loaded = true;
        self.state_store.reset().await
    }

    /// Admission port: queue a new signal. Accepted only while `Running`.
    pub fn add_signal(&mut self, signal: PendingSignal) -> Result<(), AdmissionError> {
        let now = Utc::now();
        if self.run_state != RunState::Running {
            return Err(AdmissionError::NotRunning);
        }
        if !exec_types::signal::is_valid_ticker(&signal.ticker) {
            self.events.emit(EngineEvent::SignalRejected {
                at: now,
                ticker: signal.ticker.clone(),
                reason: "invalid_ticker".to_string(),
            });
            return Err(AdmissionError::InvalidTicker(signal.ticker));
        }

        match self.queue.add(signal.clone(), now) {
            Ok(()) => {
                self.events.emit(EngineEvent::SignalAccepted {
                    at: now,
                    ticker: signal.ticker,
                });
                Ok(())
            }
            Err(reason) => {
                self.events.emit(EngineEvent::SignalRejected {
                    at: now,
                    ticker: signal.ticker,
                    reason: reason.to_string(),
                });
                Err(reason.into())
            }
        }
    }

    /// Run the fixed-interval loop until `stop()` transitions the run state
    /// to `Draining`. Intended to be spawned as its own task by the caller.
    pub async fn run_forever(&mut self) {
        let interval = self
            .config
            .check_interval()
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(120));
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            if self.run_state == RunState::Stopped {
                break;
            }
            let report = self.run_cycle().await;
            info!(?report, "cycle complete");
            if self.run_state == RunState::Draining {
                self.run_state = RunState::Stopped;
                break;
            }
        }
    }

    /// The full per-cycle algorithm: sync, exits, entries, order polling,
    /// persistence, summary event. Step numbers below match the cycle
    /// description this engine implements.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let now = Utc::now();
        let mut report = CycleReport::default();

        // 1. Clear the per-cycle signal cache; load persisted state once.
        self.cache.clear();
        if !self.state_loaded {
            self.load_initial_state().await;
            self.state_loaded = true;
        }

        // 2. Sync positions from the broker.
        let broker_positions = match self.broker.list_positions().await {
            Ok(positions) => positions,
            Err(err) => {
                warn!(%err, "broker sync failed, aborting cycle");
                self.events.emit(EngineEvent::SyncFailed {
                    at: now,
                    reason: err.to_string(),
                });
                report.aborted_at_sync = true;
                return report;
            }
        };
        let sync_result = self.positions.sync_from_broker(broker_positions);
        for closed in sync_result.closed {
            self.events.emit(EngineEvent::PositionClosed {
                at: now,
                ticker: closed.ticker,
            });
        }

        let account = self.broker.account().await.ok();
        let market_clock = self.broker.market_clock().await.ok();
        let vix = self.market_provider.vix().await.unwrap_or(VIX_NEUTRAL_SENTINEL);

        // 3. Process exits over every bracket-less tracked position.
        report.exits = self.process_exits(now, vix, &account, &market_clock).await;

        // 4. Capacity check.
        let available_slots = self.config.max_positions.saturating_sub(self.positions.count());

        // 5. Process entries from the queue in priority order.
        if available_slots > 0 {
            report.entries = self
                .process_entries(now, vix, &account, &market_clock, available_slots)
                .await;
        }

        // 6. Poll order events.
        self.poll_orders(now).await;

        // 7. Persist state.
        self.persist(now).await;

        // 8. Emit the cycle summary.
        report.positions = self.positions.count();
        report.queue_size = self.queue.size();
        self.events.emit(EngineEvent::CycleComplete {
            at: now,
            entries: report.entries,
            exits: report.exits,
            positions: report.positions,
            queue_size: report.queue_size,
        });

        report
    }

    async fn load_initial_state(&mut self) {
        match self.state_store.load().await {
            Ok(state) => self.restore_from(state),
            Err(err) => {
                error!(%err, "failed to load persisted state, starting empty");
            }
        }
    }

    fn restore_from(&mut self, state: PersistedState) {
        self.queue = SignalQueue::from_entries(state.queue, self.config.max_signals, self.config.default_signal_ttl());
        self.positions = PositionTracker::from_entries(state.positions);
        self.cooldowns = CooldownManager::from_entries(state.cooldowns);
    }

    fn build_context(
        &self,
        vix: f64,
        account: &Option<exec_types::broker::AccountSnapshot>,
        market_clock: &Option<exec_types::broker::MarketClock>,
        now: DateTime<Utc>,
    ) -> MarketContext {
        MarketContext {
            vix,
            market_status: market_clock
                .as_ref()
                .map(|clock| clock.status)
                .unwrap_or(exec_types::context::MarketStatus::Closed),
            account_equity: account.map(|a| a.equity).unwrap_or_default(),
            buying_power: account.map(|a| a.buying_power).unwrap_or_default(),
            existing_positions: self.positions.all().map(|p| p.ticker.clone()).collect(),
            cooldown_tickers: self.cooldowns.all_active(now),
        }
    }

    async fn process_exits(
        &mut self,
        now: DateTime<Utc>,
        vix: f64,
        account: &Option<exec_types::broker::AccountSnapshot>,
        market_clock: &Option<exec_types::broker::MarketClock>,
    ) -> usize {
        let context = self.build_context(vix, account, market_clock, now);
        // Positions with a broker-side bracket handle their own exit; only
        // bracket-less positions go through strategy-driven dynamic exit.
        let needs_dynamic_exit: Vec<String> = self
            .positions
            .all()
            .filter(|p| !p.has_bracket_order)
            .map(|p| p.ticker.clone())
            .collect();

        let mut exits = 0;
        for ticker in needs_dynamic_exit {
            let Some(position) = self.positions.get(&ticker).cloned() else {
                continue;
            };

            let technical = match self.fetch_technical(&ticker, now).await {
                Some(technical) => technical,
                None => continue,
            };

            let strategy = match self.strategies.get(&position.strategy_name, None) {
                Ok(strategy) => strategy,
                Err(_) => match self.strategies.get(&self.active_strategy, None) {
                    Ok(strategy) => strategy,
                    Err(_) => continue,
                },
            };

            let decision = strategy.evaluate_exit(&position, &technical, &context);
            if !decision.should_exit {
                continue;
            }

            let bypass_retry = decision.urgency == Urgency::Immediate;
            match self.orders.close_position(&ticker, bypass_retry).await {
                Ok(outcome) => {
                    exits += 1;
                    self.events.emit(EngineEvent::ExitTriggered {
                        at: now,
                        ticker: ticker.clone(),
                        reason: decision.reason.clone(),
                        urgency: decision.urgency,
                    });
                    if let SubmitOutcome::DryRun { description, .. } = &outcome {
                        self.events.emit(EngineEvent::DryRun {
                            at: now,
                            ticker: ticker.clone(),
                            description: description.clone(),
                        });
                    }
                    if let Some(position) = self.positions.get_mut(&ticker) {
                        position.exit_attempts += 1;
                        position.last_exit_attempt = Some(now);
                    }
                    self.cooldowns.add(
                        &ticker,
                        now + self.config.cooldown_duration(),
                        decision.reason.clone(),
                        "engine",
                    );
                }
                Err(err) => {
                    warn!(ticker = %ticker, %err, "exit order failed");
                    self.record_reject(&ticker, now);
                }
            }
        }
        exits
    }

    async fn process_entries(
        &mut self,
        now: DateTime<Utc>,
        vix: f64,
        account: &Option<exec_types::broker::AccountSnapshot>,
        market_clock: &Option<exec_types::broker::MarketClock>,
        available_slots: usize,
    ) -> usize {
        let signals = self.queue.pop_ready(now, available_slots);
        let mut entries = 0;

        for signal in signals {
            if self.positions.count() >= self.config.max_positions {
                self.events.emit(EngineEvent::CapacityReached {
                    at: now,
                    ticker: signal.ticker,
                });
                continue;
            }

            let context = self.build_context(vix, account, market_clock, now);
            if let Some(reason) = context.passes_common_entry_prefilter(&signal.ticker) {
                self.events.emit(EngineEvent::SignalRejected {
                    at: now,
                    ticker: signal.ticker,
                    reason: reason.to_string(),
                });
                continue;
            }

            let technical = match self.fetch_technical(&signal.ticker, now).await {
                Some(technical) => technical,
                None => {
                    self.events.emit(EngineEvent::SignalRejected {
                        at: now,
                        ticker: signal.ticker,
                        reason: "signals_unavailable".to_string(),
                    });
                    continue;
                }
            };

            let strategy = match self.strategies.get(&self.active_strategy, None) {
                Ok(strategy) => strategy,
                Err(err) => {
                    error!(%err, "active strategy not registered");
                    continue;
                }
            };

            let decision = strategy.evaluate_entry(&signal, &context, &technical);
            if !decision.should_enter {
                self.events.emit(EngineEvent::SignalRejected {
                    at: now,
                    ticker: signal.ticker.clone(),
                    reason: decision.reason.clone(),
                });
                continue;
            }

            if !decision.satisfies_safety_invariant() {
                error!(ticker = %signal.ticker, "entry decision violated the safety invariant, aborting remaining entries this cycle");
                break;
            }

            let side = Side::from(signal.action);
            let params = BracketOrderParams {
                ticker: signal.ticker.clone(),
                side: signal.action,
                quantity: decision.suggested_size,
                entry_price: decision.entry_price,
                stop_loss: decision.stop_loss.expect("checked by safety invariant"),
                target: decision.target,
            };

            match self.orders.submit_bracket_order(params).await {
                Ok(outcome) => {
                    entries += 1;
                    let entry_order_id = match &outcome {
                        SubmitOutcome::Submitted(order_id) => order_id.to_string(),
                        SubmitOutcome::DryRun { order_id, .. } => order_id.to_string(),
                    };
                    self.positions.add_position(
                        signal.ticker.clone(),
                        side,
                        decision.suggested_size,
                        decision.entry_price,
                        strategy.name().to_string(),
                        decision.stop_loss,
                        Some(decision.target),
                        entry_order_id,
                    );
                    self.events.emit(EngineEvent::EntryTriggered {
                        at: now,
                        ticker: signal.ticker.clone(),
                        strategy: strategy.name().to_string(),
                        quantity: decision.suggested_size,
                        entry_price: decision.entry_price,
                    });
                    self.events.emit(EngineEvent::PositionOpened {
                        at: now,
                        ticker: signal.ticker.clone(),
                        strategy: strategy.name().to_string(),
                    });
                    if let SubmitOutcome::DryRun { description, .. } = outcome {
                        self.events.emit(EngineEvent::DryRun {
                            at: now,
                            ticker: signal.ticker,
                            description,
                        });
                    }
                }
                Err(OrderError::Validation(err)) => {
                    error!(ticker = %signal.ticker, %err, "bracket params failed validation despite safety invariant check");
                }
                Err(OrderError::Broker(err)) => {
                    warn!(ticker = %signal.ticker, %err, "entry order rejected by broker");
                    self.events.emit(EngineEvent::OrderRejected {
                        at: now,
                        order_id: String::new(),
                        ticker: signal.ticker.clone(),
                        reason: err.to_string(),
                    });
                    self.record_reject(&signal.ticker, now);
                }
            }
        }
        entries
    }

    async fn poll_orders(&mut self, now: DateTime<Utc>) {
        let events = match self.orders.poll_orders().await {
            Ok(events) => events,
            Err(err) => {
                warn!(%err, "polling order updates failed");
                return;
            }
        };

        for order_event in events {
            match order_event.kind {
                OrderEventKind::Filled => {
                    if let Some(fill_price) = order_event.fill_price {
                        self.positions.update_price(&order_event.ticker, fill_price);
                        self.events.emit(EngineEvent::OrderFilled {
                            at: now,
                            order_id: order_event.order_id.to_string(),
                            ticker: order_event.ticker,
                            fill_price,
                        });
                    }
                }
                OrderEventKind::Rejected => {
                    self.events.emit(EngineEvent::OrderRejected {
                        at: now,
                        order_id: order_event.order_id.to_string(),
                        ticker: order_event.ticker.clone(),
                        reason: order_event.reason.unwrap_or_default(),
                    });
                    self.record_reject(&order_event.ticker, now);
                }
                OrderEventKind::Canceled => {
                    info!(ticker = %order_event.ticker, order_id = %order_event.order_id, "order canceled");
                }
            }
        }
    }

    /// Track a rejection against the last hour's window; on reaching
    /// `max_reject_before_cooldown` within that window, apply a cooldown.
    fn record_reject(&mut self, ticker: &str, now: DateTime<Utc>) {
        let window_start = now - Duration::hours(1);
        let entry = self.recent_rejects.entry(ticker.to_string()).or_default();
        entry.push(now);
        entry.retain(|at| *at >= window_start);

        if entry.len() as u32 >= self.config.max_reject_before_cooldown {
            self.cooldowns.add(
                ticker,
                now + self.config.cooldown_duration(),
                "repeated_rejects",
                "engine",
            );
        }
    }

    async fn fetch_technical(&mut self, ticker: &str, now: DateTime<Utc>) -> Option<exec_types::cache::TechnicalSignals> {
        if let Some(cached) = self.cache.get(ticker, now) {
            return Some(cached.clone());
        }
        match self.signal_provider.fetch_signals(ticker).await {
            Ok(technical) => {
                self.cache.insert(ticker, technical.clone(), now);
                Some(technical)
            }
            Err(err) => {
                warn!(ticker, %err, "technical signal fetch failed");
                None
            }
        }
    }

    async fn persist(&mut self, now: DateTime<Utc>) {
        self.cooldowns.prune(now);
        let outstanding_orders = self
            .positions
            .all()
            .map(|p| (p.ticker.clone(), p.entry_order_id.clone()))
            .collect();
        let state = PersistedState {
            schema_version: crate::persistence::CURRENT_SCHEMA_VERSION.to_string(),
            checkpoint: now,
            queue: self.queue.snapshot(),
            positions: self.positions.snapshot(),
            cooldowns: self.cooldowns.snapshot(),
            outstanding_orders,
        };

        if let Err(err) = self.state_store.save(&state).await {
            error!(%err, "failed to persist engine state");
            self.events.emit(EngineEvent::PersistenceFailed {
                at: now,
                reason: err.to_string(),
            });
        }
    }
}
