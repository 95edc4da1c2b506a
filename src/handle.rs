//! Download handle
//!
//! Per-URL status facade combining session and registry state into one
//! state machine, exposed as a replay-latest status stream plus imperative
//! controls. A handle installs its bus subscription at construction and
//! tears it down on drop; independent handles for the same key each track
//! the same transitions without coordinating with each other.

use crate::bus::EventBus;
use crate::error::Result;
use crate::protocol::{DownloadEvent, DownloadKey, DownloadStatus};
use crate::registry::DownloadRegistry;
use crate::session::DownloadSession;
use crate::store::PlayableAsset;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Per-URL reactive status facade
pub struct DownloadHandle {
    key: DownloadKey,
    session: Arc<DownloadSession>,
    registry: Arc<DownloadRegistry>,
    status: Arc<watch::Sender<DownloadStatus>>,
    last_percent: Arc<RwLock<f64>>,
    watcher: Option<JoinHandle<()>>,
}

impl DownloadHandle {
    /// Create a handle for `key`.
    ///
    /// The initial status is computed eagerly: `Downloaded` when the
    /// registry currently locates a playable asset, `Unspecified`
    /// otherwise. A downloaded asset cannot regress, so in that case no
    /// bus subscription is installed at all.
    pub fn new(
        key: DownloadKey,
        session: Arc<DownloadSession>,
        registry: Arc<DownloadRegistry>,
    ) -> Self {
        let initial = offline_status(&registry, &key);
        let already_downloaded = initial.is_downloaded();
        let (status, _) = watch::channel(initial);
        let status = Arc::new(status);
        let last_percent = Arc::new(RwLock::new(0.0));

        // Subscribe before returning so no event published after
        // construction can be missed.
        let watcher = if already_downloaded {
            None
        } else {
            let events = session.bus().subscribe();
            Some(spawn_watcher(
                key.clone(),
                events,
                Arc::clone(&status),
                Arc::clone(&last_percent),
            ))
        };

        Self {
            key,
            session,
            registry,
            status,
            last_percent,
            watcher,
        }
    }

    /// The key this handle tracks
    pub fn key(&self) -> &DownloadKey {
        &self.key
    }

    /// Subscribe to the status stream.
    ///
    /// The receiver immediately holds the latest known status and then
    /// observes every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<DownloadStatus> {
        self.status.subscribe()
    }

    /// The latest status as seen by the reactive stream
    pub fn latest(&self) -> DownloadStatus {
        self.status.borrow().clone()
    }

    /// On-demand status check combining the offline state with a live
    /// engine query.
    ///
    /// The reactive stream can miss the initial progress events when the
    /// handle was created after the transfer started; this reports
    /// `Downloading` with the last known percent whenever the engine holds
    /// a live task for the key, and the static status otherwise.
    pub async fn query_status(&self) -> DownloadStatus {
        let percent = *self.last_percent.read();
        let fallback = offline_status(&self.registry, &self.key);
        if self.session.is_active(&self.key).await {
            DownloadStatus::Downloading { percent }
        } else {
            fallback
        }
    }

    /// Start downloading the asset.
    ///
    /// Returns `Ok(false)` without an engine call when the asset is
    /// already downloaded, and `Ok(false)` when a transfer is already in
    /// flight; `Ok(true)` when a new transfer was started.
    pub async fn start(&self, title: &str) -> Result<bool> {
        if offline_status(&self.registry, &self.key).is_downloaded() {
            return Ok(false);
        }
        self.session.start(&self.key, title).await
    }

    /// Pause the in-flight transfer; `false` when none exists
    pub async fn pause(&self) -> bool {
        self.session.pause(&self.key).await
    }

    /// Resume the paused transfer; `false` when none exists
    pub async fn resume(&self) -> bool {
        self.session.resume(&self.key).await
    }

    /// Cancel the in-flight transfer; `false` when none exists
    pub async fn cancel(&self) -> bool {
        self.session.cancel(&self.key).await
    }

    /// A validated playable asset for the key, if one is on disk
    pub fn asset(&self) -> Option<PlayableAsset> {
        self.registry.locate(&self.key)
    }

    /// The validated playable path for the key, if one is on disk
    pub fn playable_path(&self) -> Option<PathBuf> {
        self.registry.playable_location(&self.key)
    }

    /// Delete the downloaded asset and its registry entry
    pub fn delete(&self) -> Result<()> {
        self.registry.remove(&self.key)
    }
}

impl Drop for DownloadHandle {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

fn offline_status(registry: &DownloadRegistry, key: &DownloadKey) -> DownloadStatus {
    if registry.locate(key).is_some() {
        DownloadStatus::Downloaded
    } else {
        DownloadStatus::Unspecified
    }
}

fn spawn_watcher(
    key: DownloadKey,
    mut events: broadcast::Receiver<DownloadEvent>,
    status: Arc<watch::Sender<DownloadStatus>>,
    last_percent: Arc<RwLock<f64>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("status watcher for {} lagged, {} event(s) missed", key, missed);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if event.key() != &key {
                continue;
            }
            match event {
                DownloadEvent::Progress { percent, .. } => {
                    // Completion is checked per event: a stale progress
                    // notification arriving after `Completed` must not
                    // regress the terminal state.
                    if status.borrow().is_downloaded() {
                        continue;
                    }
                    *last_percent.write() = percent;
                    status.send_replace(DownloadStatus::Downloading { percent });
                }
                DownloadEvent::Completed { .. } => {
                    status.send_replace(DownloadStatus::Downloaded);
                    // Terminal for this key; nothing left to observe.
                    break;
                }
                DownloadEvent::Failed { error, .. } => {
                    status.send_replace(DownloadStatus::Error { message: error });
                }
            }
        }
    })
}
