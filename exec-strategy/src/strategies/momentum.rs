use crate::strategy::Strategy;
use exec_types::cache::TechnicalSignals;
use exec_types::context::MarketContext;
use exec_types::decision::{EntryDecision, ExitDecision, Urgency};
use exec_types::position::TrackedPosition;
use exec_types::signal::{Action, PendingSignal, TradeType};
use rust_decimal::Decimal;

/// Validate-mode strategy: verifies the AI analyst's `agent_recommendation`
/// technically and, on accept, uses it verbatim rather than recomputing
/// entry/stop/target/size itself.
#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Reject if `technical.momentum` is below this.
    pub min_momentum: f64,
    /// Required `technical.score` when a breakout pattern is present.
    pub required_score: f64,
    /// Required `technical.score` when no breakout pattern is detected
    /// (strictly higher than `required_score`).
    pub required_score_no_breakout: f64,
    /// Momentum reversal threshold for an `urgent` exit on a profitable
    /// position.
    pub reversal_momentum: f64,
    /// Score below which a profitable position exits as `urgent`
    /// ("score collapse").
    pub score_collapse: f64,
    /// Momentum below which an exit is `immediate` regardless of P&L.
    pub immediate_momentum: f64,
    pub max_position_pct: Decimal,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            min_momentum: 0.0,
            required_score: 0.6,
            required_score_no_breakout: 0.75,
            reversal_momentum: -15.0,
            score_collapse: 0.3,
            immediate_momentum: -25.0,
            max_position_pct: Decimal::new(10, 2), // 10%
        }
    }
}

pub struct MomentumStrategy {
    config: MomentumConfig,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }

    fn has_breakout_pattern(technical: &TechnicalSignals) -> bool {
        technical.signals.iter().any(|s| s == "breakout")
    }

    fn is_weak(technical: &TechnicalSignals) -> bool {
        technical.signals.iter().any(|s| s == "weak")
    }
}

impl Strategy for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn max_position_pct(&self) -> Decimal {
        self.config.max_position_pct
    }

    fn evaluate_entry(
        &self,
        signal: &PendingSignal,
        _context: &MarketContext,
        technical: &TechnicalSignals,
    ) -> EntryDecision {
        let Some(recommendation) = &signal.agent_recommendation else {
            return EntryDecision::reject("momentum requires an agent_recommendation");
        };

        let expected_direction = match signal.action {
            Action::Buy => TradeType::Long,
            Action::Short => TradeType::Short,
            Action::Sell | Action::Cover => {
                return EntryDecision::reject("sell/cover are not opening actions");
            }
        };
        if recommendation.trade_type != expected_direction {
            return EntryDecision::reject("agent_recommendation trade_type does not match signal action");
        }

        if technical.momentum < self.config.min_momentum {
            return EntryDecision::reject("momentum below min_threshold");
        }

        let required_score = if Self::has_breakout_pattern(technical) {
            self.config.required_score
        } else {
            self.config.required_score_no_breakout
        };
        if technical.score < required_score {
            return EntryDecision::reject("score below required threshold");
        }

        if Self::is_weak(technical) {
            return EntryDecision::reject("technicals marked weak");
        }

        EntryDecision {
            should_enter: true,
            reason: "agent setup validated".to_string(),
            suggested_size: recommendation.quantity,
            entry_price: recommendation.entry_price,
            stop_loss: Some(recommendation.stop_loss),
            target: recommendation.target,
        }
    }

    fn evaluate_exit(&self, position: &TrackedPosition, technical: &TechnicalSignals, _context: &MarketContext) -> ExitDecision {
        if technical.momentum < self.config.immediate_momentum {
            return ExitDecision::exit("momentum collapse", Urgency::Immediate);
        }

        let profitable = position.unrealized_pnl > Decimal::ZERO;
        if profitable {
            if technical.momentum < self.config.reversal_momentum {
                return ExitDecision::exit("major momentum reversal", Urgency::Urgent);
            }
            if technical.score < self.config.score_collapse {
                return ExitDecision::exit("score collapse", Urgency::Urgent);
            }
            return ExitDecision::hold();
        }

        if Self::is_weak(technical) {
            return ExitDecision::exit("confirmed weakness on a losing position", Urgency::Normal);
        }

        ExitDecision::hold()
    }
}
