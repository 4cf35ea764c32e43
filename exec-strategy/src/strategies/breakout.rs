use crate::strategy::Strategy;
use exec_types::cache::{Bar, TechnicalSignals};
use exec_types::context::MarketContext;
use exec_types::decision::{EntryDecision, ExitDecision, Urgency};
use exec_types::position::TrackedPosition;
use exec_types::signal::{PendingSignal, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct BreakoutConfig {
    /// Consolidation window length in bars, excluding the current bar.
    pub consolidation_len: usize,
    /// Maximum allowed (high - low) / low over the consolidation window.
    pub max_consolidation_pct: f64,
    /// Current bar volume must be at least this multiple of the window's
    /// average volume.
    pub volume_multiple: f64,
    /// Minimum ATR required to consider a breakout tradeable.
    pub min_atr: f64,
    /// Target distance as a multiple of the consolidation pattern height.
    pub target_multiple: f64,
    /// After this many recorded false breakouts for a ticker, entry is
    /// blocked regardless of cooldown state.
    pub max_false_breakouts: u32,
    pub max_position_pct: Decimal,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            consolidation_len: 10,
            max_consolidation_pct: 0.05,
            volume_multiple: 1.5,
            min_atr: 0.5,
            target_multiple: 1.5,
            max_false_breakouts: 3,
            max_position_pct: Decimal::new(10, 2),
        }
    }
}

/// Autonomous-mode strategy: detects its own consolidation-breakout setup
/// from recent bar history rather than validating an agent recommendation.
pub struct BreakoutStrategy {
    config: BreakoutConfig,
    false_breakouts: Mutex<HashMap<String, u32>>,
}

impl BreakoutStrategy {
    pub fn new(config: BreakoutConfig) -> Self {
        Self {
            config,
            false_breakouts: Mutex::new(HashMap::new()),
        }
    }

    fn false_breakout_count(&self, ticker: &str) -> u32 {
        *self.false_breakouts.lock().expect("lock poisoned").get(ticker).unwrap_or(&0)
    }

    fn record_false_breakout(&self, ticker: &str) {
        let count = {
            let mut guard = self.false_breakouts.lock().expect("lock poisoned");
            let entry = guard.entry(ticker.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        warn!(ticker, count, max = self.config.max_false_breakouts, "false breakout recorded");
    }

    fn consolidation_window(&self, bars: &[Bar]) -> Option<(&[Bar], &Bar)> {
        if bars.len() < self.config.consolidation_len + 1 {
            return None;
        }
        let current = bars.last()?;
        let window_start = bars.len() - 1 - self.config.consolidation_len;
        let window = &bars[window_start..bars.len() - 1];
        Some((window, current))
    }
}

impl Strategy for BreakoutStrategy {
    fn name(&self) -> &str {
        "breakout"
    }

    fn max_position_pct(&self) -> Decimal {
        self.config.max_position_pct
    }

    fn evaluate_entry(
        &self,
        signal: &PendingSignal,
        context: &MarketContext,
        technical: &TechnicalSignals,
    ) -> EntryDecision {
        if self.false_breakout_count(&signal.ticker) >= self.config.max_false_breakouts {
            return EntryDecision::reject("too many false breakouts recorded, re-entry blocked");
        }

        let Some((window, current)) = self.consolidation_window(&technical.bars) else {
            return EntryDecision::reject("insufficient bar history for consolidation window");
        };

        let window_high = window.iter().map(|b| b.high).fold(Decimal::MIN, Decimal::max);
        let window_low = window.iter().map(|b| b.low).fold(Decimal::MAX, Decimal::min);
        if window_low <= Decimal::ZERO {
            return EntryDecision::reject("invalid consolidation window");
        }

        let range_pct = ((window_high - window_low) / window_low).to_f64().unwrap_or(f64::MAX);
        if range_pct > self.config.max_consolidation_pct {
            return EntryDecision::reject("window is not a consolidation (range too wide)");
        }

        let avg_volume = window.iter().map(|b| b.volume as f64).sum::<f64>() / window.len() as f64;
        if (current.volume as f64) < self.config.volume_multiple * avg_volume {
            return EntryDecision::reject("insufficient volume for breakout confirmation");
        }

        if technical.atr < self.config.min_atr {
            return EntryDecision::reject("ATR below minimum");
        }

        let pattern_height = window_high - window_low;
        let atr_decimal = Decimal::try_from(technical.atr).unwrap_or(Decimal::ZERO);
        let (stop_loss, target) = if current.close > window_high {
            (
                window_low - atr_decimal,
                current.close + pattern_height * self.config.target_multiple_decimal(),
            )
        } else if current.close < window_low {
            (
                window_high + atr_decimal,
                current.close - pattern_height * self.config.target_multiple_decimal(),
            )
        } else {
            return EntryDecision::reject("price did not close outside the consolidation window");
        };

        let size = self.calculate_position_size(context, current.close, context.buying_power);
        if size <= 0 {
            return EntryDecision::reject("calculated position size is zero");
        }

        EntryDecision {
            should_enter: true,
            reason: "consolidation breakout confirmed".to_string(),
            suggested_size: size,
            entry_price: current.close,
            stop_loss: Some(stop_loss),
            target,
        }
    }

    fn evaluate_exit(&self, position: &TrackedPosition, technical: &TechnicalSignals, _context: &MarketContext) -> ExitDecision {
        let price = technical.price;
        match position.side {
            Side::Long => {
                if let Some(stop) = position.stop_loss {
                    if price <= stop {
                        self.record_false_breakout(&position.ticker);
                        return ExitDecision::exit("stop breached without bracket protection", Urgency::Immediate);
                    }
                }
                if let Some(target) = position.target {
                    if price >= target {
                        return ExitDecision::exit("breakout target reached", Urgency::Normal);
                    }
                }
            }
            Side::Short => {
                if let Some(stop) = position.stop_loss {
                    if price >= stop {
                        self.record_false_breakout(&position.ticker);
                        return ExitDecision::exit("stop breached without bracket protection", Urgency::Immediate);
                    }
                }
                if let Some(target) = position.target {
                    if price <= target {
                        return ExitDecision::exit("breakout target reached", Urgency::Normal);
                    }
                }
            }
        }
        ExitDecision::hold()
    }
}

impl BreakoutConfig {
    fn target_multiple_decimal(&self) -> Decimal {
        Decimal::try_from(self.target_multiple).unwrap_or(Decimal::ONE)
    }
}
