//! Per-ticker cooldown policy and broker-reconciled position tracking.

pub mod cooldown;
pub mod position_tracker;

pub use cooldown::{CooldownManager, DEFAULT_COOLDOWN};
pub use position_tracker::{PositionTracker, SyncResult, DEFAULT_CLOSED_HISTORY};
