//! The [`Strategy`] capability contract, a [`StrategyRegistry`], and the
//! three concrete strategies: Momentum (validate-mode), Breakout and
//! Mean-Reversion (autonomous-mode).

pub mod indicators;
pub mod registry;
pub mod strategies;
pub mod strategy;

pub use registry::{StrategyConfigOverrides, StrategyRegistry};
pub use strategy::Strategy;

pub use strategies::breakout::{BreakoutConfig, BreakoutStrategy};
pub use strategies::mean_reversion::{MeanReversionConfig, MeanReversionStrategy};
pub use strategies::momentum::{MomentumConfig, MomentumStrategy};
