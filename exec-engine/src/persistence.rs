use chrono::{DateTime, Utc};
use exec_types::cooldown::Cooldown;
use exec_types::position::TrackedPosition;
use exec_types::signal::PendingSignal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const CURRENT_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error persisting engine state: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize engine state: {0}")]
    Serialize(serde_json::Error),
    #[error("failed to deserialize engine state: {0}")]
    Deserialize(serde_json::Error),
}

/// Everything the engine needs to resume exactly where it left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub schema_version: String,
    pub checkpoint: DateTime<Utc>,
    pub queue: Vec<PendingSignal>,
    pub positions: Vec<TrackedPosition>,
    pub cooldowns: Vec<Cooldown>,
    /// Outstanding broker order id per ticker, for orders whose fill/reject
    /// has not yet been observed via `poll_orders`.
    pub outstanding_orders: HashMap<String, String>,
}

impl PersistedState {
    pub fn empty() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            checkpoint: Utc::now(),
            queue: Vec::new(),
            positions: Vec::new(),
            cooldowns: Vec::new(),
            outstanding_orders: HashMap::new(),
        }
    }
}

/// Atomic write-to-temp-then-rename persistence for [`PersistedState`].
///
/// On a schema mismatch, `load` attempts forward migration by version
/// number; migration is a no-op today since there is only one schema
/// version, so any mismatch falls straight to the "back up and start
/// empty" path. On an unparsable file, the file is renamed aside with a
/// `.corrupt-<timestamp>` suffix rather than overwritten, so no data is
/// silently destroyed.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn save(&self, state: &PersistedState) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(state).map_err(StateError::Serialize)?;
        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<PersistedState, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(PersistedState::empty()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<PersistedState>(&bytes) {
            Ok(state) if state.schema_version == CURRENT_SCHEMA_VERSION => Ok(state),
            Ok(state) => {
                warn!(found = %state.schema_version, expected = %CURRENT_SCHEMA_VERSION, "unmigratable schema version, starting empty");
                self.backup_incompatible().await?;
                Ok(PersistedState::empty())
            }
            Err(err) => {
                warn!(%err, "engine state file is not valid JSON, starting empty");
                self.backup_incompatible().await?;
                Ok(PersistedState::empty())
            }
        }
    }

    /// Delete the state file; the next `load` starts from empty state.
    pub async fn reset(&self) -> Result<(), StateError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    async fn backup_incompatible(&self) -> Result<(), StateError> {
        let backup_path = self.incompatible_backup_path();
        match tokio::fs::rename(&self.path, &backup_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn incompatible_backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".corrupt-{}", Utc::now().timestamp()));
        PathBuf::from(backup)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
