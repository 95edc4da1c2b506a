//! Persisted settings store
//!
//! The registry persists its URL→path mapping as a flat string map under a
//! single fixed storage key. How that blob reaches durable storage is this
//! trait's concern: [`JsonFileSettings`] keeps it in a JSON file,
//! [`MemorySettings`] keeps it in memory for tests.
//!
//! Loading is fail-open: malformed or missing persisted data reads back as
//! absent and must never fail startup.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Durable key→map storage consumed by the registry
pub trait SettingsStore: Send + Sync {
    /// Read the mapping stored under `key`, if any
    fn get(&self, key: &str) -> Option<HashMap<String, String>>;

    /// Durably store `value` under `key`, replacing any previous mapping
    fn set(&self, key: &str, value: &HashMap<String, String>);
}

/// In-memory settings store for testing
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<HashMap<String, String>> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &HashMap<String, String>) {
        self.values.write().insert(key.to_string(), value.clone());
    }
}

/// Settings store backed by a single JSON file.
///
/// The file holds one JSON object mapping storage keys to flat string maps.
/// Every `set` rewrites the file; write failures are logged and swallowed
/// so a full disk cannot take the coordinator down with it.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
}

type Blob = HashMap<String, HashMap<String, String>>;

impl JsonFileSettings {
    /// Create a store persisting to the JSON file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Blob {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Blob::default(),
        };
        match serde_json::from_slice(&raw) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(
                    "malformed settings file at {:?}, starting empty: {}",
                    self.path,
                    e
                );
                Blob::default()
            }
        }
    }

    fn save(&self, blob: &Blob) {
        let raw = match serde_json::to_vec_pretty(blob) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("failed to encode settings: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, raw) {
            tracing::warn!("failed to persist settings to {:?}: {}", self.path, e);
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<HashMap<String, String>> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &HashMap<String, String>) {
        let mut blob = self.load();
        blob.insert(key.to_string(), value.clone());
        self.save(&blob);
    }
}
