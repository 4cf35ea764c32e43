use chrono::{DateTime, Duration, Utc};
use exec_types::cooldown::Cooldown;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Default duration applied to a cooldown recorded without an explicit one.
pub const DEFAULT_COOLDOWN: Duration = Duration::hours(3);

/// Per-ticker cooldown set with expiry and extend-only re-add semantics.
///
/// Re-adding a cooldown for an already-cooled-down ticker extends `until`
/// only if the new `until` is later; it never truncates an existing window.
/// This matches the cooldown as a floor on re-entry risk, not a reset.
#[derive(Debug, Default, Clone)]
pub struct CooldownManager {
    active: HashMap<String, Cooldown>,
}

impl CooldownManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Cooldown>) -> Self {
        let mut manager = Self::new();
        for cooldown in entries {
            manager.active.insert(cooldown.ticker.clone(), cooldown);
        }
        manager
    }

    /// Idempotent add: extends `until` only if later than any existing
    /// active cooldown for the ticker.
    pub fn add(&mut self, ticker: &str, until: DateTime<Utc>, reason: impl Into<String>, source: impl Into<String>) {
        match self.active.get_mut(ticker) {
            Some(existing) if existing.until >= until => {
                debug!(ticker, existing_until = %existing.until, "cooldown extension ignored, not later");
            }
            Some(existing) => {
                let reason = reason.into();
                debug!(ticker, until = %until, %reason, "extending existing cooldown");
                existing.until = until;
                existing.reason = reason;
                existing.source = source.into();
            }
            None => {
                let reason = reason.into();
                debug!(ticker, until = %until, %reason, "starting new cooldown");
                self.active.insert(
                    ticker.to_string(),
                    Cooldown {
                        ticker: ticker.to_string(),
                        until,
                        reason,
                        source: source.into(),
                    },
                );
            }
        }
    }

    pub fn add_default(&mut self, ticker: &str, now: DateTime<Utc>, reason: impl Into<String>, source: impl Into<String>) {
        self.add(ticker, now + DEFAULT_COOLDOWN, reason, source);
    }

    pub fn contains(&self, ticker: &str, now: DateTime<Utc>) -> bool {
        self.active
            .get(ticker)
            .is_some_and(|cooldown| cooldown.is_active(now))
    }

    pub fn all_active(&self, now: DateTime<Utc>) -> HashSet<String> {
        self.active
            .values()
            .filter(|cooldown| cooldown.is_active(now))
            .map(|cooldown| cooldown.ticker.clone())
            .collect()
    }

    /// Drop expired entries, returning the count removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.active.len();
        self.active.retain(|_, cooldown| cooldown.is_active(now));
        before - self.active.len()
    }

    pub fn snapshot(&self) -> Vec<Cooldown> {
        self.active.values().cloned().collect()
    }
}
