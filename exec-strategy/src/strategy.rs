use exec_types::cache::TechnicalSignals;
use exec_types::context::MarketContext;
use exec_types::decision::{EntryDecision, ExitDecision};
use exec_types::position::TrackedPosition;
use exec_types::signal::PendingSignal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// The capability contract a concrete strategy implements.
///
/// # Authority model
/// A strategy operates in one of two modes, a runtime property of the
/// concrete strategy and its inputs rather than a subtype distinction:
/// - **Validate mode** (see [`crate::strategies::momentum::MomentumStrategy`]):
///   the signal carries an `agent_recommendation`; the strategy verifies
///   technical alignment only and, on accept, uses the recommendation's
///   entry/stop/target/quantity verbatim.
/// - **Autonomous mode** (Breakout, Mean-Reversion): the strategy detects
///   its own setup and computes entry/stop/target/size itself.
///
/// The engine applies the common pre-filter (market open, no existing
/// position, no active cooldown) before calling `evaluate_entry`; a
/// strategy only needs to apply its own additional filters.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Fraction of account equity this strategy is willing to commit to a
    /// single new position; feeds the default `calculate_position_size`.
    fn max_position_pct(&self) -> Decimal;

    fn evaluate_entry(
        &self,
        signal: &PendingSignal,
        context: &MarketContext,
        technical: &TechnicalSignals,
    ) -> EntryDecision;

    fn evaluate_exit(
        &self,
        position: &TrackedPosition,
        technical: &TechnicalSignals,
        context: &MarketContext,
    ) -> ExitDecision;

    /// `min(max_position_pct * account_equity, max_amount) / price`,
    /// floored to a whole share count.
    fn calculate_position_size(&self, context: &MarketContext, price: Decimal, max_amount: Decimal) -> i64 {
        if price <= Decimal::ZERO {
            return 0;
        }
        let cap = (self.max_position_pct() * context.account_equity).min(max_amount);
        (cap / price).floor().to_i64().unwrap_or(0).max(0)
    }
}
