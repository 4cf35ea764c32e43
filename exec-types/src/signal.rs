use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction a [`PendingSignal`] proposes taking on a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
    Short,
    Cover,
}

/// Side of a [`crate::position::TrackedPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

/// Trade direction carried on an [`AgentRecommendation`].
///
/// Distinct from [`Side`] because it is supplied by an external producer
/// before any [`crate::position::TrackedPosition`] exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Long,
    Short,
}

impl From<TradeType> for Side {
    fn from(value: TradeType) -> Self {
        match value {
            TradeType::Long => Side::Long,
            TradeType::Short => Side::Short,
        }
    }
}

/// Position side a bracket-opening [`Action`] establishes. Only meaningful
/// for `Buy`/`Short`; `Sell`/`Cover` close rather than open a position, so
/// the mapping is a best-effort direction for callers that need a total
/// function (e.g. logging) and should not be relied on for closes.
impl From<Action> for Side {
    fn from(action: Action) -> Self {
        match action {
            Action::Buy | Action::Cover => Side::Long,
            Action::Sell | Action::Short => Side::Short,
        }
    }
}

/// Verbatim setup produced by the AI analyst workflow for a signal in
/// validate-mode authority (see [`crate::decision::EntryDecision`]).
///
/// This is the narrow struct the admission boundary accepts in place of the
/// upstream LangGraph/GPT agent pipeline: the Execution Core never calls
/// into that pipeline, it only reads this value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentRecommendation {
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub target: Decimal,
    pub quantity: i64,
    pub trade_type: TradeType,
}

/// A queued trade proposal awaiting admission into a position.
///
/// Invariants (enforced by [`exec_queue::SignalQueue`], not this type):
/// `expires_at > created_at` when set, and a ticker appears at most once in
/// the queue at any time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PendingSignal {
    pub ticker: String,
    pub action: Action,
    pub priority: i64,
    pub confidence: u8,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub agent_recommendation: Option<AgentRecommendation>,
}

impl PendingSignal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// A ticker is 1-5 uppercase ASCII letters.
pub fn is_valid_ticker(ticker: &str) -> bool {
    (1..=5).contains(&ticker.len()) && ticker.bytes().all(|b| b.is_ascii_uppercase())
}
