use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exec_engine::{EngineConfig, ExecutionEngine};
use exec_strategy::{MomentumConfig, MomentumStrategy, StrategyRegistry};
use exec_types::broker::{AccountSnapshot, Broker, BrokerPosition, MarketClock, OrderEvent, OrderId};
use exec_types::cache::TechnicalSignals;
use exec_types::context::MarketStatus;
use exec_types::error::{BrokerError, DataError};
use exec_types::provider::{MarketContextProvider, SignalProvider};
use exec_types::signal::{Action, AgentRecommendation, PendingSignal, Side, TradeType};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct StubBroker {
    positions: Mutex<Vec<BrokerPosition>>,
    fail_list_positions: bool,
}

impl StubBroker {
    fn new() -> Self {
        Self {
            positions: Mutex::new(Vec::new()),
            fail_list_positions: false,
        }
    }

    fn with_positions(positions: Vec<BrokerPosition>) -> Self {
        Self {
            positions: Mutex::new(positions),
            fail_list_positions: false,
        }
    }

    fn clear_positions(&self) {
        self.positions.lock().unwrap().clear();
    }
}

#[async_trait]
impl Broker for StubBroker {
    async fn list_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        if self.fail_list_positions {
            return Err(BrokerError::Transient {
                ticker: None,
                message: "broker unreachable".to_string(),
            });
        }
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn submit_bracket(
        &self,
        ticker: &str,
        _side: exec_types::signal::Side,
        _quantity: i64,
        _entry_price: Decimal,
        _stop_loss: Decimal,
        _target: Decimal,
    ) -> Result<OrderId, BrokerError> {
        Ok(OrderId(format!("order-{ticker}")))
    }

    async fn close_position(&self, ticker: &str) -> Result<OrderId, BrokerError> {
        Ok(OrderId(format!("close-{ticker}")))
    }

    async fn cancel_order(&self, _order_id: &OrderId) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn poll_order_updates(&self, _since: DateTime<Utc>) -> Result<Vec<OrderEvent>, BrokerError> {
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
            next_open: Utc::now(),
            next_close: Utc::now(),
        })
    }
}

struct StubSignalProvider {
    signals: HashMap<String, TechnicalSignals>,
}

#[async_trait]
impl SignalProvider for StubSignalProvider {
    async fn fetch_signals(&self, ticker: &str) -> Result<TechnicalSignals, DataError> {
        self.signals
            .get(ticker)
            .cloned()
            .ok_or_else(|| DataError::SignalUnavailable(ticker.to_string()))
    }
}

struct StubMarketContextProvider;

#[async_trait]
impl MarketContextProvider for StubMarketContextProvider {
    async fn vix(&self) -> Option<f64> {
        Some(18.0)
    }
}

fn technical(ticker: &str) -> TechnicalSignals {
    TechnicalSignals {
        symbol: ticker.to_string(),
        price: Decimal::new(150, 0),
        atr: 2.0,
        momentum: 5.0,
        score: 0.8,
        signals: vec!["breakout".to_string()],
        bars: vec![],
    }
}

fn momentum_signal(ticker: &str) -> PendingSignal {
    PendingSignal {
        ticker: ticker.to_string(),
        action: Action::Buy,
        priority: 10,
        confidence: 90,
        source: "scanner".to_string(),
        created_at: Utc::now(),
        expires_at: None,
        agent_recommendation: Some(AgentRecommendation {
            entry_price: Decimal::new(150, 0),
            stop_loss: Decimal::new(145, 0),
            target: Decimal::new(165, 0),
            quantity: 100,
            trade_type: TradeType::Long,
        }),
    }
}

fn registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    registry.register("momentum", |_overrides| Arc::new(MomentumStrategy::new(MomentumConfig::default())));
    registry
}

fn test_config(state_path: std::path::PathBuf) -> EngineConfig {
    EngineConfig {
        max_positions: 5,
        state_file_path: state_path,
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn happy_path_enters_a_validated_momentum_signal() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(StubBroker::new());
    let mut signals = HashMap::new();
    signals.insert("AAPL".to_string(), technical("AAPL"));
    let provider = Arc::new(StubSignalProvider { signals });

    let mut engine = ExecutionEngine::new(
        test_config(dir.path().join("state.json")),
        broker,
        provider,
        Arc::new(StubMarketContextProvider),
        registry(),
        "momentum",
    );
    engine.start();
    engine.add_signal(momentum_signal("AAPL")).unwrap();

    let report = engine.run_cycle().await;
    assert_eq!(report.entries, 1);
    assert_eq!(report.positions, 1);
    assert_eq!(report.queue_size, 0);
}

#[tokio::test]
async fn duplicate_ticker_signal_is_rejected_on_admission() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(StubBroker::new());
    let provider = Arc::new(StubSignalProvider { signals: HashMap::new() });
    let mut engine = ExecutionEngine::new(
        test_config(dir.path().join("state.json")),
        broker,
        provider,
        Arc::new(StubMarketContextProvider),
        registry(),
        "momentum",
    );
    engine.start();

    assert!(engine.add_signal(momentum_signal("TSLA")).is_ok());
    assert!(engine.add_signal(momentum_signal("TSLA")).is_err());
}

#[tokio::test]
async fn analyze_mode_opens_no_real_broker_position_but_tracks_locally() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(StubBroker::new());
    let mut signals = HashMap::new();
    signals.insert("AAPL".to_string(), technical("AAPL"));
    let provider = Arc::new(StubSignalProvider { signals });

    let mut config = test_config(dir.path().join("state.json"));
    config.analyze_mode = true;
    let mut engine = ExecutionEngine::new(
        config,
        broker,
        provider,
        Arc::new(StubMarketContextProvider),
        registry(),
        "momentum",
    );
    engine.start();
    engine.add_signal(momentum_signal("AAPL")).unwrap();

    let report = engine.run_cycle().await;
    assert_eq!(report.entries, 1);
    assert_eq!(report.positions, 1);
}

#[tokio::test]
async fn broker_sync_failure_aborts_the_cycle_before_touching_entries() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(StubBroker {
        positions: Mutex::new(Vec::new()),
        fail_list_positions: true,
    });
    let mut signals = HashMap::new();
    signals.insert("AAPL".to_string(), technical("AAPL"));
    let provider = Arc::new(StubSignalProvider { signals });

    let mut engine = ExecutionEngine::new(
        test_config(dir.path().join("state.json")),
        broker,
        provider,
        Arc::new(StubMarketContextProvider),
        registry(),
        "momentum",
    );
    engine.start();
    engine.add_signal(momentum_signal("AAPL")).unwrap();

    let report = engine.run_cycle().await;
    assert!(report.aborted_at_sync);
    assert_eq!(report.entries, 0);
}

#[tokio::test]
async fn persisted_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    {
        let broker = Arc::new(StubBroker::new());
        let mut signals = HashMap::new();
        signals.insert("AAPL".to_string(), technical("AAPL"));
        let provider = Arc::new(StubSignalProvider { signals });

        let mut engine = ExecutionEngine::new(
            test_config(state_path.clone()),
            broker,
            provider,
            Arc::new(StubMarketContextProvider),
            registry(),
            "momentum",
        );
        engine.start();
        engine.add_signal(momentum_signal("AAPL")).unwrap();
        let report = engine.run_cycle().await;
        assert_eq!(report.entries, 1);
    }

    // A fresh engine pointed at the same state file picks up where the
    // first one left off. The stub broker here is a new instance that
    // reports no positions at all, so reconciliation immediately closes
    // out whatever was loaded - a `position_closed` event for AAPL is
    // only possible if the persisted position was actually restored.
    {
        let broker = Arc::new(StubBroker::new());
        let provider = Arc::new(StubSignalProvider { signals: HashMap::new() });
        let mut engine = ExecutionEngine::new(
            test_config(state_path.clone()),
            broker,
            provider,
            Arc::new(StubMarketContextProvider),
            registry(),
            "momentum",
        );
        let closed_tickers: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let closed_tickers_handle = Arc::clone(&closed_tickers);
        engine.on_event(move |event| {
            if let exec_types::event::EngineEvent::PositionClosed { ticker, .. } = event {
                closed_tickers_handle.lock().unwrap().push(ticker.clone());
            }
        });
        engine.start();
        let report = engine.run_cycle().await;
        assert_eq!(report.positions, 0);
        assert_eq!(closed_tickers.lock().unwrap().as_slice(), ["AAPL"]);
    }
}

fn losing_position(ticker: &str, has_bracket_order: bool) -> exec_types::position::TrackedPosition {
    exec_types::position::TrackedPosition {
        ticker: ticker.to_string(),
        side: Side::Long,
        quantity: 10,
        avg_entry_price: Decimal::new(160, 0),
        current_price: Decimal::new(150, 0),
        market_value: Decimal::new(1500, 0),
        unrealized_pnl: Decimal::new(-100, 0),
        unrealized_pnl_pct: Decimal::new(-625, 4),
        strategy_name: "momentum".to_string(),
        opened_at: Utc::now(),
        entry_order_id: "order-seed".to_string(),
        stop_loss: Some(Decimal::new(140, 0)),
        target: Some(Decimal::new(180, 0)),
        has_bracket_order,
        exit_attempts: 0,
        last_exit_attempt: None,
        notes: vec![],
    }
}

async fn seed_state(state_path: &std::path::Path, position: exec_types::position::TrackedPosition) {
    let store = exec_engine::StateStore::new(state_path.to_path_buf());
    let mut state = exec_engine::PersistedState::empty();
    state.positions.push(position);
    store.save(&state).await.unwrap();
}

#[tokio::test]
async fn exit_before_entry_ordering_frees_capacity_on_the_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    seed_state(&state_path, losing_position("MSFT", false)).await;

    let broker = Arc::new(StubBroker::with_positions(vec![BrokerPosition {
        ticker: "MSFT".to_string(),
        side: Side::Long,
        quantity: 10,
        avg_entry_price: Decimal::new(160, 0),
        current_price: Decimal::new(150, 0),
    }]));
    let mut signals = HashMap::new();
    signals.insert(
        "MSFT".to_string(),
        TechnicalSignals {
            symbol: "MSFT".to_string(),
            price: Decimal::new(150, 0),
            atr: 2.0,
            momentum: 0.0,
            score: 0.2,
            signals: vec!["weak".to_string()],
            bars: vec![],
        },
    );
    signals.insert("AAPL".to_string(), technical("AAPL"));
    let provider = Arc::new(StubSignalProvider { signals });

    let mut config = test_config(state_path.clone());
    config.max_positions = 1;
    let mut engine = ExecutionEngine::new(
        config,
        Arc::clone(&broker),
        provider,
        Arc::new(StubMarketContextProvider),
        registry(),
        "momentum",
    );

    let event_kinds: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let event_kinds_handle = Arc::clone(&event_kinds);
    engine.on_event(move |event| {
        let kind = match event {
            exec_types::event::EngineEvent::ExitTriggered { ticker, .. } => Some(format!("exit_triggered({ticker})")),
            exec_types::event::EngineEvent::EntryTriggered { ticker, .. } => Some(format!("entry_triggered({ticker})")),
            _ => None,
        };
        if let Some(kind) = kind {
            event_kinds_handle.lock().unwrap().push(kind);
        }
    });

    engine.start();
    engine.add_signal(momentum_signal("AAPL")).unwrap();

    // Cycle 1: MSFT is still broker-reported, so capacity is full; the
    // losing, bracket-less position exits but AAPL stays queued.
    let first = engine.run_cycle().await;
    assert_eq!(first.exits, 1);
    assert_eq!(first.entries, 0);

    // Cycle 2: the broker now reflects the close, freeing the one slot.
    broker.clear_positions();
    let second = engine.run_cycle().await;
    assert_eq!(second.entries, 1);

    assert_eq!(
        event_kinds.lock().unwrap().as_slice(),
        ["exit_triggered(MSFT)", "entry_triggered(AAPL)"]
    );
}

#[tokio::test]
async fn bracketed_position_skips_strategy_driven_exit_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    seed_state(&state_path, losing_position("NVDA", true)).await;

    let broker = Arc::new(StubBroker::with_positions(vec![BrokerPosition {
        ticker: "NVDA".to_string(),
        side: Side::Long,
        quantity: 10,
        avg_entry_price: Decimal::new(160, 0),
        current_price: Decimal::new(150, 0),
    }]));
    let mut signals = HashMap::new();
    signals.insert(
        "NVDA".to_string(),
        TechnicalSignals {
            symbol: "NVDA".to_string(),
            // Far enough below `immediate_momentum` that, if `evaluate_exit`
            // were ever consulted for this position, it would fire an
            // immediate exit. A bracket order must make that call unreachable.
            price: Decimal::new(150, 0),
            atr: 2.0,
            momentum: -30.0,
            score: 0.2,
            signals: vec![],
            bars: vec![],
        },
    );
    let provider = Arc::new(StubSignalProvider { signals });

    let mut engine = ExecutionEngine::new(
        test_config(state_path.clone()),
        broker,
        provider,
        Arc::new(StubMarketContextProvider),
        registry(),
        "momentum",
    );
    engine.start();

    let report = engine.run_cycle().await;
    assert_eq!(report.exits, 0);
    assert_eq!(report.positions, 1);
}
