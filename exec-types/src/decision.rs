use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How urgently an exit should be actioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Urgent,
    Immediate,
}

/// A strategy's verdict on whether to enter a new position.
///
/// Safety invariant: if `should_enter` is true, `stop_loss` must be `Some`
/// and `suggested_size` must be greater than zero. The engine asserts this
/// before submitting a bracket order; a violation is an internal-invariant
/// failure (see `exec_types::error::EngineError::InvariantViolation`), not a
/// recoverable rejection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EntryDecision {
    pub should_enter: bool,
    pub reason: String,
    pub suggested_size: i64,
    pub entry_price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub target: Decimal,
}

impl EntryDecision {
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            should_enter: false,
            reason: reason.into(),
            suggested_size: 0,
            entry_price: Decimal::ZERO,
            stop_loss: None,
            target: Decimal::ZERO,
        }
    }

    pub fn satisfies_safety_invariant(&self) -> bool {
        !self.should_enter || (self.stop_loss.is_some() && self.suggested_size > 0)
    }
}

/// A strategy's verdict on whether to exit an existing position.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExitDecision {
    pub should_exit: bool,
    pub reason: String,
    pub urgency: Urgency,
}

impl ExitDecision {
    pub fn hold() -> Self {
        Self {
            should_exit: false,
            reason: "hold".to_string(),
            urgency: Urgency::Normal,
        }
    }

    pub fn exit(reason: impl Into<String>, urgency: Urgency) -> Self {
        Self {
            should_exit: true,
            reason: reason.into(),
            urgency,
        }
    }
}
