//! Priority signal queue: dedup by ticker, TTL expiration, bounded capacity.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use exec_types::signal::PendingSignal;
use indexmap::IndexMap;
use thiserror::Error;

/// Default maximum number of queued signals.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time-to-live applied when a [`PendingSignal`] omits `expires_at`.
pub const DEFAULT_TTL: ChronoDuration = ChronoDuration::hours(4);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("a signal for this ticker is already queued")]
    DuplicateTicker,
    #[error("queue is at capacity")]
    Capacity,
    #[error("signal is already expired")]
    Expired,
}

/// A bounded, deduplicating priority queue of [`PendingSignal`]s.
///
/// Ordering is strictly by `priority` ascending, with `created_at` ascending
/// as the FIFO tie-break. At most one signal per ticker is queued at any
/// time; `add` rejects a second signal for an already-queued ticker rather
/// than replacing it, so a single ticker can never monopolize a cycle.
#[derive(Debug, Clone)]
pub struct SignalQueue {
    entries: IndexMap<String, PendingSignal>,
    capacity: usize,
    default_ttl: ChronoDuration,
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl SignalQueue {
    pub fn new(capacity: usize, default_ttl: ChronoDuration) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity,
            default_ttl,
        }
    }

    /// Restore a queue from persisted contents verbatim (no TTL/capacity
    /// re-validation; that already happened when these entries were added).
    pub fn from_entries(entries: Vec<PendingSignal>, capacity: usize, default_ttl: ChronoDuration) -> Self {
        let mut map = IndexMap::with_capacity(entries.len());
        for signal in entries {
            map.insert(signal.ticker.clone(), signal);
        }
        Self {
            entries: map,
            capacity,
            default_ttl,
        }
    }

    pub fn add(&mut self, mut signal: PendingSignal, now: DateTime<Utc>) -> Result<(), RejectReason> {
        if signal.expires_at.is_none() {
            signal.expires_at = Some(signal.created_at + self.default_ttl);
        }
        if signal.is_expired(now) {
            return Err(RejectReason::Expired);
        }
        if self.entries.contains_key(&signal.ticker) {
            return Err(RejectReason::DuplicateTicker);
        }
        if self.entries.len() >= self.capacity {
            return Err(RejectReason::Capacity);
        }
        self.entries.insert(signal.ticker.clone(), signal);
        Ok(())
    }

    /// Remove up to `limit` non-expired signals in priority order. Expired
    /// signals encountered along the way are dropped, not returned.
    pub fn pop_ready(&mut self, now: DateTime<Utc>, limit: usize) -> Vec<PendingSignal> {
        self.prune_expired(now);

        let mut ordered: Vec<String> = self.entries.keys().cloned().collect();
        ordered.sort_by(|a, b| {
            let sa = &self.entries[a];
            let sb = &self.entries[b];
            sa.priority
                .cmp(&sb.priority)
                .then_with(|| sa.created_at.cmp(&sb.created_at))
        });

        ordered
            .into_iter()
            .take(limit)
            .filter_map(|ticker| self.entries.shift_remove(&ticker))
            .collect()
    }

    /// The next signal that would be returned by [`Self::pop_ready`],
    /// without removing it. Does not prune expired entries as a side
    /// effect; an expired head is skipped in the comparison only.
    pub fn peek(&self) -> Option<&PendingSignal> {
        self.entries
            .values()
            .min_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.created_at.cmp(&b.created_at)))
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.entries.contains_key(ticker)
    }

    pub fn remove(&mut self, ticker: &str) -> Option<PendingSignal> {
        self.entries.shift_remove(ticker)
    }

    /// Drop all expired entries, returning the count removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, signal)| signal.is_expired(now))
            .map(|(ticker, _)| ticker.clone())
            .collect();
        for ticker in &expired {
            self.entries.shift_remove(ticker);
        }
        expired.len()
    }

    pub fn snapshot(&self) -> Vec<PendingSignal> {
        self.entries.values().cloned().collect()
    }
}
