//! Settings persistence backend
//!
//! Best-effort storage for the settings record. The timer must function
//! without persistence: load failures fall back to defaults, save failures
//! are logged and ignored.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::Settings;

/// The on-disk settings record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    #[serde(flatten)]
    pub settings: Settings,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSettings {
    pub fn now(settings: Settings) -> Self {
        Self {
            settings,
            saved_at: Utc::now(),
        }
    }
}

/// Key/value style storage for the settings record. Asynchronous delivery
/// is the caller's concern (`PuzzleSession` saves fire-and-forget); the
/// backend itself is a plain blocking get/set.
pub trait SettingsBackend: Send + Sync {
    /// Retrieve the persisted record, `None` when no prior state exists
    fn get(&self) -> Result<Option<PersistedSettings>, String>;

    /// Persist the full record, replacing any prior one
    fn set(&self, record: &PersistedSettings) -> Result<(), String>;
}

/// JSON-file backend
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsBackend for FileBackend {
    fn get(&self) -> Result<Option<PersistedSettings>, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(format!("Failed to read {}: {}", self.path.display(), e)),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| format!("Failed to parse {}: {}", self.path.display(), e))
    }

    fn set(&self, record: &PersistedSettings) -> Result<(), String> {
        let raw = serde_json::to_string_pretty(record)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        std::fs::write(&self.path, raw)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }
}

/// In-memory backend for tests and the ephemeral demo session
#[derive(Default)]
pub struct MemoryBackend {
    record: Mutex<Option<PersistedSettings>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsBackend for MemoryBackend {
    fn get(&self) -> Result<Option<PersistedSettings>, String> {
        self.record
            .lock()
            .map(|r| r.clone())
            .map_err(|e| format!("Failed to lock memory backend: {}", e))
    }

    fn set(&self, record: &PersistedSettings) -> Result<(), String> {
        let mut slot = self
            .record
            .lock()
            .map_err(|e| format!("Failed to lock memory backend: {}", e))?;
        *slot = Some(record.clone());
        Ok(())
    }
}
