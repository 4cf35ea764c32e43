use crate::decision::Urgency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Typed events emitted to the event sink registry.
///
/// `ScanComplete` documents the producer side of the contract (the scanner
/// and aggregation pipeline upstream of `add_signal`); the Execution Core
/// never emits it itself, only the remaining variants.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    ScanComplete {
        at: DateTime<Utc>,
        candidates_found: usize,
    },
    SignalAccepted {
        at: DateTime<Utc>,
        ticker: String,
    },
    SignalRejected {
        at: DateTime<Utc>,
        ticker: String,
        reason: String,
    },
    EntryTriggered {
        at: DateTime<Utc>,
        ticker: String,
        strategy: String,
        quantity: i64,
        entry_price: Decimal,
    },
    ExitTriggered {
        at: DateTime<Utc>,
        ticker: String,
        reason: String,
        urgency: Urgency,
    },
    OrderFilled {
        at: DateTime<Utc>,
        order_id: String,
        ticker: String,
        fill_price: Decimal,
    },
    OrderRejected {
        at: DateTime<Utc>,
        order_id: String,
        ticker: String,
        reason: String,
    },
    PositionOpened {
        at: DateTime<Utc>,
        ticker: String,
        strategy: String,
    },
    PositionClosed {
        at: DateTime<Utc>,
        ticker: String,
    },
    CycleComplete {
        at: DateTime<Utc>,
        entries: usize,
        exits: usize,
        positions: usize,
        queue_size: usize,
    },
    SyncFailed {
        at: DateTime<Utc>,
        reason: String,
    },
    PersistenceFailed {
        at: DateTime<Utc>,
        reason: String,
    },
    CapacityReached {
        at: DateTime<Utc>,
        ticker: String,
    },
    DryRun {
        at: DateTime<Utc>,
        ticker: String,
        description: String,
    },
}

impl EngineEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            EngineEvent::ScanComplete { at, .. }
            | EngineEvent::SignalAccepted { at, .. }
            | EngineEvent::SignalRejected { at, .. }
            | EngineEvent::EntryTriggered { at, .. }
            | EngineEvent::ExitTriggered { at, .. }
            | EngineEvent::OrderFilled { at, .. }
            | EngineEvent::OrderRejected { at, .. }
            | EngineEvent::PositionOpened { at, .. }
            | EngineEvent::PositionClosed { at, .. }
            | EngineEvent::CycleComplete { at, .. }
            | EngineEvent::SyncFailed { at, .. }
            | EngineEvent::PersistenceFailed { at, .. }
            | EngineEvent::CapacityReached { at, .. }
            | EngineEvent::DryRun { at, .. } => *at,
        }
    }
}

/// A handler registry receiving [`EngineEvent`]s.
///
/// Kept as a plain `Vec` of boxed closures rather than a pub/sub crate: a
/// simple owned sink the engine drains, not a broadcast bus.
#[derive(Default)]
pub struct EventSink {
    handlers: Vec<Box<dyn Fn(&EngineEvent) + Send + Sync>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn emit(&self, event: EngineEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
