//! Transfer engine capability
//!
//! The actual segmented-media transfer (chunked fetch, manifest parsing,
//! bitrate selection) lives behind [`TransferEngine`]. The coordinator only
//! ever starts tasks, enumerates them, and consumes their callbacks.
//!
//! Correlation contract: `begin_transfer` tags the created task with the
//! download key's URL string. The engine's live task list is the single
//! source of truth for what is in flight — the session never caches tasks,
//! so a relaunched process re-correlates against tasks that survived in the
//! engine's background session.
//!
//! Callbacks arrive as [`TransferUpdate`] values on one serial queue, so
//! updates for a given task are strictly ordered as the engine delivered
//! them.

use crate::protocol::TimeRange;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;
use uuid::Uuid;

/// An in-flight transfer owned by the engine
#[async_trait]
pub trait TransferTask: Send + Sync {
    /// The opaque correlation tag assigned at creation (the key's URL
    /// string), if the engine still knows it
    fn correlation_tag(&self) -> Option<String>;

    /// Resume a suspended or freshly created task
    async fn resume(&self);

    /// Suspend the task, keeping partial state for a later resume
    async fn suspend(&self);

    /// Cancel the task. The engine reports the cancellation through its
    /// error callback.
    async fn cancel(&self);
}

/// The segmented-media transfer capability
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Begin a transfer for `url`, tagging the task with `tag`.
    ///
    /// Returns `None` when the engine refuses to create a task.
    async fn begin_transfer(
        &self,
        url: &Url,
        title: &str,
        tag: &str,
    ) -> Option<Arc<dyn TransferTask>>;

    /// All tasks the engine currently knows about, including tasks created
    /// by a previous process instance.
    async fn tasks(&self) -> Vec<Arc<dyn TransferTask>>;
}

/// A callback from the transfer engine, delivered on a serial queue
#[derive(Debug, Clone)]
pub enum TransferUpdate {
    /// Progress: the time ranges loaded so far and the range expected to
    /// load in total
    Loaded {
        tag: String,
        loaded: Vec<TimeRange>,
        expected: TimeRange,
    },
    /// The task finished writing its output at `location`. When `error` is
    /// set the output is a failed partial download.
    Finished {
        tag: String,
        location: PathBuf,
        error: Option<String>,
    },
    /// The task failed without producing output (network loss, cancel)
    Errored { tag: String, message: String },
}

impl TransferUpdate {
    /// The correlation tag this update belongs to
    pub fn tag(&self) -> &str {
        match self {
            Self::Loaded { tag, .. } => tag,
            Self::Finished { tag, .. } => tag,
            Self::Errored { tag, .. } => tag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimTaskState {
    Running,
    Suspended,
    Cancelled,
    Finished,
}

/// A task owned by [`SimulatedEngine`]
pub struct SimulatedTask {
    id: Uuid,
    tag: String,
    url: Url,
    title: String,
    state: RwLock<SimTaskState>,
    updates: mpsc::UnboundedSender<TransferUpdate>,
}

impl SimulatedTask {
    /// Task identity, unique per `begin_transfer`
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The URL the task was created for
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The asset title passed at creation
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the task is currently suspended
    pub fn is_suspended(&self) -> bool {
        *self.state.read() == SimTaskState::Suspended
    }

    fn is_live(&self) -> bool {
        matches!(
            *self.state.read(),
            SimTaskState::Running | SimTaskState::Suspended
        )
    }
}

#[async_trait]
impl TransferTask for SimulatedTask {
    fn correlation_tag(&self) -> Option<String> {
        Some(self.tag.clone())
    }

    async fn resume(&self) {
        let mut state = self.state.write();
        if *state == SimTaskState::Suspended {
            *state = SimTaskState::Running;
        }
    }

    async fn suspend(&self) {
        let mut state = self.state.write();
        if *state == SimTaskState::Running {
            *state = SimTaskState::Suspended;
        }
    }

    async fn cancel(&self) {
        {
            let mut state = self.state.write();
            if !matches!(*state, SimTaskState::Running | SimTaskState::Suspended) {
                return;
            }
            *state = SimTaskState::Cancelled;
        }
        let _ = self.updates.send(TransferUpdate::Errored {
            tag: self.tag.clone(),
            message: "cancelled".to_string(),
        });
    }
}

/// In-memory transfer engine for testing.
///
/// Tests drive the engine by hand: `begin_transfer` registers a live task,
/// the `emit_*` methods play the role of the real engine's callbacks, and
/// the task list reflects cancellations and completions so that
/// `is_active`-style queries observe engine ground truth.
pub struct SimulatedEngine {
    tasks: RwLock<Vec<Arc<SimulatedTask>>>,
    updates: mpsc::UnboundedSender<TransferUpdate>,
    begun: AtomicUsize,
    refuse: RwLock<bool>,
}

impl SimulatedEngine {
    /// Create an engine plus the serial queue its callbacks arrive on
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TransferUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            tasks: RwLock::new(Vec::new()),
            updates: tx,
            begun: AtomicUsize::new(0),
            refuse: RwLock::new(false),
        });
        (engine, rx)
    }

    /// How many transfers were actually begun
    pub fn begin_count(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    /// Make subsequent `begin_transfer` calls refuse with `None`
    pub fn refuse_transfers(&self, refuse: bool) {
        *self.refuse.write() = refuse;
    }

    /// Emit a progress callback for the task tagged `tag`
    pub fn emit_loaded(&self, tag: &str, loaded: Vec<TimeRange>, expected: TimeRange) {
        let _ = self.updates.send(TransferUpdate::Loaded {
            tag: tag.to_string(),
            loaded,
            expected,
        });
    }

    /// Emit a completion callback and retire the task from the live list
    pub fn emit_finished(&self, tag: &str, location: impl Into<PathBuf>, error: Option<&str>) {
        for task in self.tasks.read().iter() {
            if task.tag == tag {
                *task.state.write() = SimTaskState::Finished;
            }
        }
        let _ = self.updates.send(TransferUpdate::Finished {
            tag: tag.to_string(),
            location: location.into(),
            error: error.map(str::to_string),
        });
    }

    /// Emit an error callback and retire the task from the live list
    pub fn emit_errored(&self, tag: &str, message: &str) {
        for task in self.tasks.read().iter() {
            if task.tag == tag {
                *task.state.write() = SimTaskState::Finished;
            }
        }
        let _ = self.updates.send(TransferUpdate::Errored {
            tag: tag.to_string(),
            message: message.to_string(),
        });
    }

    /// Register a live task without going through `begin_transfer`,
    /// simulating a task that survived a process relaunch.
    pub fn inject_task(&self, url: &Url, tag: &str) -> Arc<SimulatedTask> {
        let task = Arc::new(SimulatedTask {
            id: Uuid::new_v4(),
            tag: tag.to_string(),
            url: url.clone(),
            title: String::new(),
            state: RwLock::new(SimTaskState::Suspended),
            updates: self.updates.clone(),
        });
        self.tasks.write().push(Arc::clone(&task));
        task
    }
}

#[async_trait]
impl TransferEngine for SimulatedEngine {
    async fn begin_transfer(
        &self,
        url: &Url,
        title: &str,
        tag: &str,
    ) -> Option<Arc<dyn TransferTask>> {
        if *self.refuse.read() {
            return None;
        }
        let task = Arc::new(SimulatedTask {
            id: Uuid::new_v4(),
            tag: tag.to_string(),
            url: url.clone(),
            title: title.to_string(),
            state: RwLock::new(SimTaskState::Running),
            updates: self.updates.clone(),
        });
        self.tasks.write().push(Arc::clone(&task));
        self.begun.fetch_add(1, Ordering::SeqCst);
        Some(task)
    }

    async fn tasks(&self) -> Vec<Arc<dyn TransferTask>> {
        self.tasks
            .read()
            .iter()
            .filter(|t| t.is_live())
            .map(|t| Arc::clone(t) as Arc<dyn TransferTask>)
            .collect()
    }
}
