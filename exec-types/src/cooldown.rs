use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A per-ticker timed prohibition on new entries.
///
/// Invariant: a ticker has at most one active [`Cooldown`] at any time;
/// expired entries are pruned on read by [`exec_risk::cooldown::CooldownManager`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Cooldown {
    pub ticker: String,
    pub until: DateTime<Utc>,
    pub reason: String,
    pub source: String,
}

impl Cooldown {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.until
    }
}
