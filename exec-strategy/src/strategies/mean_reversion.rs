use crate::indicators::{bollinger_bands, rsi};
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use exec_types::cache::TechnicalSignals;
use exec_types::context::MarketContext;
use exec_types::decision::{EntryDecision, ExitDecision, Urgency};
use exec_types::position::TrackedPosition;
use exec_types::signal::{PendingSignal, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    pub rsi_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub bollinger_period: usize,
    pub bollinger_width: f64,
    /// Maximum time a position may be held before a time-based exit fires.
    pub max_hold: chrono::Duration,
    pub max_position_pct: Decimal,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            bollinger_period: 20,
            bollinger_width: 2.0,
            max_hold: chrono::Duration::hours(24),
            max_position_pct: Decimal::new(10, 2),
        }
    }
}

/// Autonomous-mode strategy: enters long on RSI oversold plus a close below
/// the lower Bollinger band, short on the mirrored overbought setup, and
/// exits on reversion to the middle band, a stop, or a max hold duration.
pub struct MeanReversionStrategy {
    config: MeanReversionConfig,
}

impl MeanReversionStrategy {
    pub fn new(config: MeanReversionConfig) -> Self {
        Self { config }
    }

    fn closes(technical: &TechnicalSignals) -> Vec<f64> {
        technical
            .bars
            .iter()
            .filter_map(|bar| bar.close.to_f64())
            .collect()
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
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
        let closes = Self::closes(technical);
        let Some(current_rsi) = rsi(self.config.rsi_period, &closes) else {
            return EntryDecision::reject("insufficient history for RSI");
        };
        let Some((lower, middle, upper)) = bollinger_bands(self.config.bollinger_period, self.config.bollinger_width, &closes) else {
            return EntryDecision::reject("insufficient history for Bollinger bands");
        };

        let price = technical.price.to_f64().unwrap_or(f64::NAN);
        let lower_decimal = Decimal::try_from(lower).unwrap_or(Decimal::ZERO);
        let middle_decimal = Decimal::try_from(middle).unwrap_or(Decimal::ZERO);
        let upper_decimal = Decimal::try_from(upper).unwrap_or(Decimal::ZERO);

        let long_setup = current_rsi <= self.config.oversold && price < lower;
        let short_setup = current_rsi >= self.config.overbought && price > upper;

        if !long_setup && !short_setup {
            return EntryDecision::reject("no oversold/overbought extreme with band confirmation");
        }

        let size = self.calculate_position_size(context, technical.price, context.buying_power);
        if size <= 0 {
            return EntryDecision::reject("calculated position size is zero");
        }

        if long_setup {
            EntryDecision {
                should_enter: true,
                reason: "RSI oversold below lower Bollinger band".to_string(),
                suggested_size: size,
                entry_price: technical.price,
                stop_loss: Some(lower_decimal - (middle_decimal - lower_decimal)),
                target: middle_decimal,
            }
        } else {
            EntryDecision {
                should_enter: true,
                reason: "RSI overbought above upper Bollinger band".to_string(),
                suggested_size: size,
                entry_price: technical.price,
                stop_loss: Some(upper_decimal + (upper_decimal - middle_decimal)),
                target: middle_decimal,
            }
        }
    }

    fn evaluate_exit(&self, position: &TrackedPosition, technical: &TechnicalSignals, _context: &MarketContext) -> ExitDecision {
        let now: DateTime<Utc> = Utc::now();
        if now - position.opened_at >= self.config.max_hold {
            return ExitDecision::exit("max hold duration reached", Urgency::Normal);
        }

        if let Some(stop) = position.stop_loss {
            let stop_breached = match position.side {
                Side::Long => technical.price <= stop,
                Side::Short => technical.price >= stop,
            };
            if stop_breached {
                return ExitDecision::exit("stop breached without bracket protection", Urgency::Immediate);
            }
        }

        let closes = Self::closes(technical);
        if let Some((_, middle, _)) = bollinger_bands(self.config.bollinger_period, self.config.bollinger_width, &closes) {
            let middle_decimal = Decimal::try_from(middle).unwrap_or(Decimal::ZERO);
            let reverted = match position.side {
                Side::Long => technical.price >= middle_decimal,
                Side::Short => technical.price <= middle_decimal,
            };
            if reverted {
                return ExitDecision::exit("reverted to mean", Urgency::Normal);
            }
        }

        ExitDecision::hold()
    }
}
