//! Download session
//!
//! Coordinator between logical downloads and engine tasks. The session
//! starts transfers, answers "is this downloading right now" against the
//! engine's live task list, applies pause/resume/cancel controls, and
//! republishes the engine's raw callbacks as [`DownloadEvent`]s on the bus.
//!
//! No session-local task cache exists: every lookup scans the engine's own
//! task list, so the session stays consistent with engine ground truth even
//! when the process was relaunched with tasks still running in the
//! background.

use crate::bus::EventBus;
use crate::engine::{TransferEngine, TransferTask, TransferUpdate};
use crate::error::{DownloadError, Result};
use crate::protocol::{DownloadEvent, DownloadKey, TimeRange};
use crate::registry::DownloadRegistry;
use crate::store::FileStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coordinator owning the in-flight transfer set for one engine
pub struct DownloadSession {
    engine: Arc<dyn TransferEngine>,
    files: Arc<dyn FileStore>,
    registry: Arc<DownloadRegistry>,
    bus: EventBus,
    shutdown: CancellationToken,
}

impl DownloadSession {
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        files: Arc<dyn FileStore>,
        registry: Arc<DownloadRegistry>,
        bus: EventBus,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine,
            files,
            registry,
            bus,
            shutdown: CancellationToken::new(),
        })
    }

    /// The bus this session publishes on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Spawn the task that drains the engine's callback queue and
    /// republishes each update on the bus, preserving arrival order.
    ///
    /// Runs until the queue closes or [`shutdown`](Self::shutdown) fires.
    pub fn spawn_pump(
        session: Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<TransferUpdate>,
    ) -> JoinHandle<()> {
        let shutdown = session.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    update = updates.recv() => match update {
                        Some(update) => session.republish(update),
                        None => break,
                    },
                }
            }
        })
    }

    fn republish(&self, update: TransferUpdate) {
        let key = match DownloadKey::parse(update.tag()) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("dropping engine update with unusable tag: {}", e);
                return;
            }
        };
        match update {
            TransferUpdate::Loaded {
                loaded, expected, ..
            } => {
                let percent = progress_percent(&loaded, &expected);
                tracing::debug!("{} -> {:.1}%", key, percent);
                self.bus.publish(DownloadEvent::Progress { key, percent });
            }
            TransferUpdate::Finished {
                location,
                error: None,
                ..
            } => {
                self.bus.publish(DownloadEvent::Completed { key, location });
            }
            TransferUpdate::Finished {
                location,
                error: Some(message),
                ..
            } => {
                // A failed completion leaves a partial file behind; clean
                // it up rather than surfacing it as a finished asset.
                if let Err(e) = self.files.delete(&location) {
                    tracing::warn!("failed to delete partial download {:?}: {}", location, e);
                }
                self.bus.publish(DownloadEvent::Failed {
                    key,
                    error: message,
                });
            }
            TransferUpdate::Errored { message, .. } => {
                tracing::debug!("{} failed: {}", key, message);
                self.bus.publish(DownloadEvent::Failed {
                    key,
                    error: message,
                });
            }
        }
    }

    async fn find_task(&self, key: &DownloadKey) -> Option<Arc<dyn TransferTask>> {
        self.engine
            .tasks()
            .await
            .into_iter()
            .find(|task| task.correlation_tag().as_deref() == Some(key.as_str()))
    }

    /// Begin a transfer for `key`, tagging the task with the key itself.
    ///
    /// Returns `Ok(false)` without touching the engine when a playable copy
    /// is already registered or a live task already carries the key; the
    /// live-task check doubles as the compare-and-start guard that keeps
    /// concurrent starts down to one engine task per key.
    pub async fn start(&self, key: &DownloadKey, title: &str) -> Result<bool> {
        if self.shutdown.is_cancelled() {
            return Err(DownloadError::Shutdown);
        }
        if self.registry.locate(key).is_some() {
            return Ok(false);
        }
        if self.find_task(key).await.is_some() {
            return Ok(false);
        }
        match self
            .engine
            .begin_transfer(key.url(), title, key.as_str())
            .await
        {
            Some(task) => {
                task.resume().await;
                tracing::info!("started transfer for {}", key);
                Ok(true)
            }
            None => {
                tracing::warn!("engine refused to create a task for {}", key);
                Ok(false)
            }
        }
    }

    /// Whether the engine currently holds a live task for `key`
    pub async fn is_active(&self, key: &DownloadKey) -> bool {
        self.find_task(key).await.is_some()
    }

    /// Suspend the live task for `key`; `false` when none exists
    pub async fn pause(&self, key: &DownloadKey) -> bool {
        match self.find_task(key).await {
            Some(task) => {
                task.suspend().await;
                true
            }
            None => false,
        }
    }

    /// Resume the live task for `key`; `false` when none exists
    pub async fn resume(&self, key: &DownloadKey) -> bool {
        match self.find_task(key).await {
            Some(task) => {
                task.resume().await;
                true
            }
            None => false,
        }
    }

    /// Cancel the live task for `key`; `false` when none exists.
    ///
    /// Cancellation surfaces asynchronously as an engine error callback,
    /// which the pump republishes as a `Failed` event.
    pub async fn cancel(&self, key: &DownloadKey) -> bool {
        match self.find_task(key).await {
            Some(task) => {
                task.cancel().await;
                true
            }
            None => false,
        }
    }

    /// Resume every task the engine still knows about, picking in-flight
    /// downloads back up after a process relaunch. Returns the number of
    /// tasks resumed.
    pub async fn restore_pending(&self) -> usize {
        let tasks = self.engine.tasks().await;
        let count = tasks.len();
        for task in tasks {
            task.resume().await;
            if let Some(tag) = task.correlation_tag() {
                tracing::info!("resumed pending transfer for {}", tag);
            }
        }
        count
    }

    /// Stop the update pump; no further events will be published
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for DownloadSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Percent of the expected duration covered by the loaded ranges.
///
/// Disjoint ranges are summed, not maxed: offline playability needs full
/// coverage. Overlapping ranges are summed as reported, without
/// deduplication, and only the published value is clamped to [0, 100].
fn progress_percent(loaded: &[TimeRange], expected: &TimeRange) -> f64 {
    if expected.duration <= 0.0 {
        return 0.0;
    }
    let covered: f64 = loaded
        .iter()
        .map(|range| range.duration / expected.duration)
        .sum();
    (covered * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use crate::settings::MemorySettings;
    use crate::store::{AssetVerifier, LocalFileStore};
    use std::path::Path;
    use tempfile::TempDir;

    fn key(s: &str) -> DownloadKey {
        DownloadKey::parse(s).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        engine: Arc<SimulatedEngine>,
        session: Arc<DownloadSession>,
        registry: Arc<DownloadRegistry>,
        pump: JoinHandle<()>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let (engine, updates) = SimulatedEngine::new();
        let store = Arc::new(LocalFileStore::new(dir.path()));
        let registry = Arc::new(DownloadRegistry::new(
            Arc::new(MemorySettings::new()),
            Arc::clone(&store) as Arc<dyn FileStore>,
            Arc::clone(&store) as Arc<dyn AssetVerifier>,
            "downloads",
        ));
        let session = DownloadSession::new(
            Arc::clone(&engine) as Arc<dyn TransferEngine>,
            store as Arc<dyn FileStore>,
            Arc::clone(&registry),
            EventBus::default(),
        );
        let pump = DownloadSession::spawn_pump(Arc::clone(&session), updates);
        Fixture {
            _dir: dir,
            engine,
            session,
            registry,
            pump,
        }
    }

    #[test]
    fn progress_sums_disjoint_ranges() {
        let loaded = vec![TimeRange::new(0.0, 30.0), TimeRange::new(60.0, 30.0)];
        let expected = TimeRange::from_duration(120.0);
        assert!((progress_percent(&loaded, &expected) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn progress_clamps_overlapping_ranges_to_100() {
        // Overlapping ranges are summed as reported; display is clamped.
        let loaded = vec![TimeRange::new(0.0, 90.0), TimeRange::new(0.0, 90.0)];
        let expected = TimeRange::from_duration(120.0);
        assert_eq!(progress_percent(&loaded, &expected), 100.0);
    }

    #[test]
    fn progress_with_unknown_expected_duration_is_zero() {
        let loaded = vec![TimeRange::new(0.0, 30.0)];
        assert_eq!(progress_percent(&loaded, &TimeRange::from_duration(0.0)), 0.0);
        assert_eq!(
            progress_percent(&loaded, &TimeRange::from_duration(-1.0)),
            0.0
        );
    }

    #[tokio::test]
    async fn start_is_a_no_op_while_a_task_is_live() {
        let f = fixture();
        let k = key("https://host/a.m3u8");

        assert!(f.session.start(&k, "Match A").await.unwrap());
        assert!(f.session.is_active(&k).await);
        // Second start for the same key must not create a second task.
        assert!(!f.session.start(&k, "Match A").await.unwrap());
        assert_eq!(f.engine.begin_count(), 1);
    }

    #[tokio::test]
    async fn start_is_a_no_op_for_registered_playable_assets() {
        let f = fixture();
        let k = key("https://host/a.m3u8");

        std::fs::write(f._dir.path().join("a.mov"), b"x").unwrap();
        f.registry.record_completion(&k, Path::new("a.mov"));

        assert!(!f.session.start(&k, "").await.unwrap());
        assert_eq!(f.engine.begin_count(), 0);
    }

    #[tokio::test]
    async fn engine_refusal_reports_not_started() {
        let f = fixture();
        f.engine.refuse_transfers(true);
        let k = key("https://host/a.m3u8");
        assert!(!f.session.start(&k, "").await.unwrap());
        assert!(!f.session.is_active(&k).await);
    }

    #[tokio::test]
    async fn controls_report_false_without_a_live_task() {
        let f = fixture();
        let k = key("https://host/never-started.m3u8");
        assert!(!f.session.pause(&k).await);
        assert!(!f.session.resume(&k).await);
        assert!(!f.session.cancel(&k).await);
    }

    #[tokio::test]
    async fn controls_apply_to_the_matching_task() {
        let f = fixture();
        let k = key("https://host/a.m3u8");
        f.session.start(&k, "").await.unwrap();

        assert!(f.session.pause(&k).await);
        assert!(f.session.resume(&k).await);
        assert!(f.session.cancel(&k).await);
        // Cancellation retires the task from the engine's live list.
        assert!(!f.session.is_active(&k).await);
    }

    #[tokio::test]
    async fn restore_pending_resumes_surviving_tasks() {
        let f = fixture();
        let k = key("https://host/a.m3u8");
        let task = f.engine.inject_task(k.url(), k.as_str());
        assert!(task.is_suspended());

        assert_eq!(f.session.restore_pending().await, 1);
        assert!(!task.is_suspended());
        assert!(f.session.is_active(&k).await);
    }

    #[tokio::test]
    async fn pump_republishes_progress_completion_and_failure() {
        let f = fixture();
        let k = key("https://host/a.m3u8");
        let mut rx = f.session.bus().subscribe();

        f.engine.emit_loaded(
            k.as_str(),
            vec![TimeRange::new(0.0, 51.0)],
            TimeRange::from_duration(120.0),
        );
        f.engine.emit_finished(k.as_str(), "store/a.movpkg", None);
        f.engine.emit_errored(k.as_str(), "network lost");

        let progress = rx.recv().await.unwrap();
        match progress {
            DownloadEvent::Progress { percent, .. } => assert!((percent - 42.5).abs() < 1e-9),
            other => panic!("expected progress, got {:?}", other),
        }
        assert!(matches!(rx.recv().await.unwrap(), DownloadEvent::Completed { .. }));
        let failed = rx.recv().await.unwrap();
        assert!(
            matches!(failed, DownloadEvent::Failed { ref error, .. } if error == "network lost")
        );
    }

    #[tokio::test]
    async fn failed_completion_deletes_the_partial_file() {
        let f = fixture();
        let k = key("https://host/a.m3u8");
        let mut rx = f.session.bus().subscribe();

        std::fs::write(f._dir.path().join("partial.movpkg"), b"x").unwrap();
        f.engine
            .emit_finished(k.as_str(), "partial.movpkg", Some("stream error"));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DownloadEvent::Failed { ref error, .. } if error == "stream error"));
        assert!(!f._dir.path().join("partial.movpkg").exists());
        assert!(f.registry.resolve(&k).is_none());
    }

    #[tokio::test]
    async fn shutdown_stops_the_pump() {
        let f = fixture();
        f.session.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), f.pump)
            .await
            .expect("pump did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn start_after_shutdown_is_an_error() {
        let f = fixture();
        f.session.shutdown();
        let result = f.session.start(&key("https://host/a.m3u8"), "").await;
        assert!(matches!(result, Err(DownloadError::Shutdown)));
    }
}
