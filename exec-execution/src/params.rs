use exec_types::error::ValidationError;
use exec_types::signal::Action;
use rust_decimal::Decimal;

/// Inputs to [`crate::order_manager::OrderManager::submit_bracket_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct BracketOrderParams {
    pub ticker: String,
    pub side: Action,
    pub quantity: i64,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub target: Decimal,
}

impl BracketOrderParams {
    /// Validates the leg-ordering invariant: for `buy`, `stop_loss <
    /// entry_price < target`; for `short`, `target < entry_price <
    /// stop_loss`. `sell`/`cover` are not valid opening sides for a bracket.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fail = |reason: &str| ValidationError::InvalidOrderParams {
            ticker: self.ticker.clone(),
            reason: reason.to_string(),
        };

        if self.quantity <= 0 {
            return Err(fail("quantity must be > 0"));
        }
        if self.entry_price <= Decimal::ZERO || self.stop_loss <= Decimal::ZERO || self.target <= Decimal::ZERO {
            return Err(fail("entry_price, stop_loss, and target must be > 0"));
        }

        match self.side {
            Action::Buy => {
                if !(self.stop_loss < self.entry_price && self.entry_price < self.target) {
                    return Err(fail("buy requires stop_loss < entry_price < target"));
                }
            }
            Action::Short => {
                if !(self.target < self.entry_price && self.entry_price < self.stop_loss) {
                    return Err(fail("short requires target < entry_price < stop_loss"));
                }
            }
            Action::Sell | Action::Cover => {
                return Err(fail("sell/cover are not valid opening sides for a bracket order"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(entry: i64, stop: i64, target: i64) -> BracketOrderParams {
        BracketOrderParams {
            ticker: "AAPL".to_string(),
            side: Action::Buy,
            quantity: 100,
            entry_price: Decimal::new(entry, 0),
            stop_loss: Decimal::new(stop, 0),
            target: Decimal::new(target, 0),
        }
    }

    #[test]
    fn buy_requires_ascending_legs() {
        assert!(buy(150, 145, 165).validate().is_ok());
        assert!(buy(150, 155, 165).validate().is_err());
        assert!(buy(150, 145, 140).validate().is_err());
    }

    #[test]
    fn short_requires_descending_legs() {
        let params = BracketOrderParams {
            ticker: "GME".to_string(),
            side: Action::Short,
            quantity: 50,
            entry_price: Decimal::new(150, 0),
            stop_loss: Decimal::new(160, 0),
            target: Decimal::new(130, 0),
        };
        assert!(params.validate().is_ok());
    }
}
