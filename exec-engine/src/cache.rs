use chrono::{DateTime, Utc};
use exec_types::cache::{CachedSignal, TechnicalSignals};
use std::collections::HashMap;
use std::time::Duration;

/// Per-ticker TTL cache for technical signals, bounding recomputation to at
/// most one fetch per ticker per cycle.
///
/// Policy (see `DESIGN.md`): cleared at the start of every cycle rather than
/// relying on TTL-only expiry. A signal looked up once inside a cycle is
/// reused for the rest of that cycle (both the exit pass and the entry
/// pass see the same value for a given ticker), and the next cycle always
/// re-fetches.
#[derive(Debug, Default, Clone)]
pub struct SignalCache {
    entries: HashMap<String, CachedSignal>,
    ttl: Duration,
}

impl SignalCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Return the cached value for `ticker` if present and fresh.
    pub fn get(&self, ticker: &str, now: DateTime<Utc>) -> Option<&TechnicalSignals> {
        self.entries
            .get(ticker)
            .filter(|cached| cached.is_fresh(now))
            .map(|cached| &cached.signal)
    }

    pub fn insert(&mut self, ticker: impl Into<String>, signal: TechnicalSignals, now: DateTime<Utc>) {
        self.entries.insert(
            ticker.into(),
            CachedSignal {
                signal,
                timestamp: now,
                ttl: self.ttl,
            },
        );
    }

    /// Clear-at-cycle-start: called at the top of every `run_cycle`.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
