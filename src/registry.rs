//! Download registry
//!
//! Persistent mapping from download key to the local path of the completed
//! asset. The mapping is written through to the settings store on every
//! mutation: completions are rare, so durability wins over throughput.
//!
//! The registry is the single writer of persisted completion state. It
//! learns about completions the same way every other observer does — by
//! subscribing to the event bus — so persistence stays decoupled from
//! transfer mechanics.

use crate::bus::EventBus;
use crate::error::{DownloadError, Result};
use crate::protocol::{DownloadEvent, DownloadKey};
use crate::settings::SettingsStore;
use crate::store::{AssetVerifier, FileStore, PlayableAsset};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Persistent registry of completed downloads
pub struct DownloadRegistry {
    settings: Arc<dyn SettingsStore>,
    files: Arc<dyn FileStore>,
    verifier: Arc<dyn AssetVerifier>,
    storage_key: String,
    /// Key URL string → recorded local path
    entries: RwLock<HashMap<String, String>>,
}

impl DownloadRegistry {
    /// Create a registry, eagerly loading the persisted mapping.
    ///
    /// Malformed or missing persisted data loads as an empty registry;
    /// startup never fails on bad state.
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        files: Arc<dyn FileStore>,
        verifier: Arc<dyn AssetVerifier>,
        storage_key: impl Into<String>,
    ) -> Self {
        let storage_key = storage_key.into();
        let entries = settings.get(&storage_key).unwrap_or_default();
        if !entries.is_empty() {
            tracing::info!(
                "restored {} completed download(s) from settings key '{}'",
                entries.len(),
                storage_key
            );
        }
        Self {
            settings,
            files,
            verifier,
            storage_key,
            entries: RwLock::new(entries),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        self.settings.set(&self.storage_key, entries);
    }

    /// Record a completed download and persist the mapping immediately
    pub fn record_completion(&self, key: &DownloadKey, location: &Path) {
        let mut entries = self.entries.write();
        entries.insert(
            key.as_str().to_string(),
            location.to_string_lossy().into_owned(),
        );
        self.persist(&entries);
        tracing::debug!("recorded completion for {} at {:?}", key, location);
    }

    /// The recorded local path for `key`, without validating the file
    pub fn resolve(&self, key: &DownloadKey) -> Option<PathBuf> {
        self.entries
            .read()
            .get(key.as_str())
            .map(PathBuf::from)
    }

    /// A validated, offline-playable asset for `key`.
    ///
    /// Playability is re-checked on every call; an entry whose backing file
    /// was deleted out from under us resolves to `None`, not a stale handle.
    pub fn locate(&self, key: &DownloadKey) -> Option<PlayableAsset> {
        let path = self.resolve(key)?;
        self.verifier.verify(&path)
    }

    /// Like [`locate`](Self::locate), but returns the raw path of the
    /// validated asset rather than an opened handle
    pub fn playable_location(&self, key: &DownloadKey) -> Option<PathBuf> {
        self.locate(key).map(|asset| asset.path().to_path_buf())
    }

    /// Delete the backing file for `key` and drop its entry.
    ///
    /// Idempotent: a missing entry or an already-absent file succeeds. A
    /// failed deletion propagates and leaves the entry in place so a retry
    /// can find it again.
    pub fn remove(&self, key: &DownloadKey) -> Result<()> {
        let path = match self.resolve(key) {
            Some(path) => path,
            None => return Ok(()),
        };
        self.files
            .delete(&path)
            .map_err(|e| DownloadError::file_delete(&path, e.to_string()))?;

        let mut entries = self.entries.write();
        entries.remove(key.as_str());
        self.persist(&entries);
        Ok(())
    }

    /// Subscribe to the bus and persist every observed completion.
    ///
    /// `Failed` events never touch the registry; failure handling and
    /// registry mutation are orthogonal.
    pub fn watch_completions(registry: Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(DownloadEvent::Completed { key, location }) => {
                        registry.record_completion(&key, &location);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("registry watcher lagged, {} event(s) missed", missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
