//! Cycle orchestration: the fixed-interval scheduler, the per-cycle signal
//! cache, and atomic persistence tying the queue/risk/execution/strategy
//! crates into one [`ExecutionEngine`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod persistence;
pub mod state;

pub use cache::SignalCache;
pub use config::EngineConfig;
pub use engine::{AdmissionError, CycleReport, ExecutionEngine};
pub use persistence::{PersistedState, StateError, StateStore, CURRENT_SCHEMA_VERSION};
pub use state::RunState;
