use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Typed configuration consumed by the engine at construction.
///
/// Loading this from disk/env (TOML, CLI flags, etc.) is out of scope for
/// the core: a thin `serde_json::from_reader` the CLI calls before handing
/// the result to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_positions: usize,
    pub max_signals: usize,
    pub default_signal_ttl_seconds: i64,
    pub max_reject_before_cooldown: u32,
    pub check_interval_seconds: i64,
    pub cycle_deadline_margin_seconds: i64,
    pub cooldown_duration_hours: i64,
    pub analyze_mode: bool,
    pub state_file_path: PathBuf,
    pub schema_version: String,
    pub broker_call_timeout_seconds: u64,
    pub closed_position_history_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_positions: 10,
            max_signals: exec_queue::DEFAULT_CAPACITY,
            default_signal_ttl_seconds: exec_queue::DEFAULT_TTL.num_seconds(),
            max_reject_before_cooldown: 3,
            check_interval_seconds: 120,
            cycle_deadline_margin_seconds: 10,
            cooldown_duration_hours: 3,
            analyze_mode: false,
            state_file_path: PathBuf::from("./engine-state.json"),
            schema_version: "1".to_string(),
            broker_call_timeout_seconds: 30,
            closed_position_history_cap: exec_risk::DEFAULT_CLOSED_HISTORY,
        }
    }
}

impl EngineConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::seconds(self.check_interval_seconds)
    }

    pub fn cycle_deadline(&self) -> Duration {
        Duration::seconds((self.check_interval_seconds - self.cycle_deadline_margin_seconds).max(1))
    }

    pub fn cooldown_duration(&self) -> Duration {
        Duration::hours(self.cooldown_duration_hours)
    }

    pub fn default_signal_ttl(&self) -> Duration {
        Duration::seconds(self.default_signal_ttl_seconds)
    }
}
