//! Shared value types, error taxonomy, events, and external-collaborator
//! interfaces for the equity execution core.

pub mod broker;
pub mod cache;
pub mod context;
pub mod cooldown;
pub mod decision;
pub mod error;
pub mod event;
pub mod position;
pub mod provider;
pub mod signal;

pub use broker::{AccountSnapshot, Broker, BrokerPosition, MarketClock, OrderEvent, OrderEventKind, OrderId};
pub use cache::{Bar, CachedSignal, TechnicalSignals};
pub use context::{MarketContext, MarketStatus, VIX_NEUTRAL_SENTINEL};
pub use cooldown::Cooldown;
pub use decision::{EntryDecision, ExitDecision, Urgency};
pub use error::{BrokerError, DataError, EngineError, ValidationError};
pub use event::{EngineEvent, EventSink};
pub use position::{ReconciliationSummary, TrackedPosition};
pub use provider::{MarketContextProvider, SignalProvider};
pub use signal::{is_valid_ticker, Action, AgentRecommendation, PendingSignal, Side, TradeType};
