//! Application-boundary wiring
//!
//! [`Downloader`] constructs the full coordination stack once and hands out
//! per-URL handles. It exists so an application builds exactly one instance
//! at its boundary and passes it down, instead of components reaching for
//! ambient global singletons.

use crate::bus::EventBus;
use crate::config::SessionConfig;
use crate::engine::{TransferEngine, TransferUpdate};
use crate::error::Result;
use crate::handle::DownloadHandle;
use crate::protocol::DownloadKey;
use crate::registry::DownloadRegistry;
use crate::session::DownloadSession;
use crate::settings::SettingsStore;
use crate::store::{AssetVerifier, FileStore, LocalFileStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The assembled download coordination stack
pub struct Downloader {
    session: Arc<DownloadSession>,
    registry: Arc<DownloadRegistry>,
    bus: EventBus,
    registry_watcher: JoinHandle<()>,
    pump: JoinHandle<()>,
}

impl Downloader {
    /// Wire up a coordinator over the given engine and settings store.
    ///
    /// `updates` is the serial queue the engine delivers its callbacks on.
    /// The registry's completion watcher and the session's update pump are
    /// spawned here and stopped by [`shutdown`](Self::shutdown).
    pub fn new(
        config: SessionConfig,
        engine: Arc<dyn TransferEngine>,
        updates: mpsc::UnboundedReceiver<TransferUpdate>,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(LocalFileStore::new(&config.base_dir));
        let bus = EventBus::new(config.event_capacity);
        let registry = Arc::new(DownloadRegistry::new(
            settings,
            Arc::clone(&store) as Arc<dyn FileStore>,
            Arc::clone(&store) as Arc<dyn AssetVerifier>,
            config.registry_key,
        ));
        // The registry observes completions like any other subscriber;
        // subscribe before any transfer can publish.
        let registry_watcher = DownloadRegistry::watch_completions(Arc::clone(&registry), &bus);
        let session = DownloadSession::new(
            engine,
            store as Arc<dyn FileStore>,
            Arc::clone(&registry),
            bus.clone(),
        );
        let pump = DownloadSession::spawn_pump(Arc::clone(&session), updates);

        Ok(Self {
            session,
            registry,
            bus,
            registry_watcher,
            pump,
        })
    }

    /// Mint a handle tracking `key`
    pub fn handle(&self, key: DownloadKey) -> DownloadHandle {
        DownloadHandle::new(key, Arc::clone(&self.session), Arc::clone(&self.registry))
    }

    /// The session coordinating engine tasks
    pub fn session(&self) -> &Arc<DownloadSession> {
        &self.session
    }

    /// The completion registry
    pub fn registry(&self) -> &Arc<DownloadRegistry> {
        &self.registry
    }

    /// The event bus external observers may subscribe on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Resume transfers that survived a process relaunch
    pub async fn restore_pending(&self) -> usize {
        self.session.restore_pending().await
    }

    /// Stop the background tasks; no further events are published
    pub fn shutdown(&self) {
        self.session.shutdown();
        self.registry_watcher.abort();
    }
}

impl Drop for Downloader {
    fn drop(&mut self) {
        self.session.shutdown();
        self.registry_watcher.abort();
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use crate::error::DownloadError;
    use crate::settings::MemorySettings;
    use tempfile::TempDir;

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let (engine, updates) = SimulatedEngine::new();
        let config = SessionConfig {
            event_capacity: 0,
            ..Default::default()
        };
        let result = Downloader::new(
            config,
            engine as Arc<dyn TransferEngine>,
            updates,
            Arc::new(MemorySettings::new()),
        );
        assert!(matches!(result, Err(DownloadError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn wires_a_working_stack() {
        let dir = TempDir::new().unwrap();
        let (engine, updates) = SimulatedEngine::new();
        let config = SessionConfig {
            base_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let downloader = Downloader::new(
            config,
            Arc::clone(&engine) as Arc<dyn TransferEngine>,
            updates,
            Arc::new(MemorySettings::new()),
        )
        .unwrap();

        let key = crate::protocol::DownloadKey::parse("https://host/a.m3u8").unwrap();
        let handle = downloader.handle(key.clone());
        assert!(handle.start("Match A").await.unwrap());
        assert!(downloader.session().is_active(&key).await);
        downloader.shutdown();
    }
}
