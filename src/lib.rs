//! # hls-dl
//!
//! A coordinator for long-running, resumable, segmented media downloads.
//!
//! ## Features
//!
//! - **Per-URL downloads**: start, pause, resume, and cancel logical
//!   downloads identified by their remote URL
//! - **Reactive status**: every download exposes a replay-latest status
//!   stream (`unspecified → downloading(percent) → downloaded | error`)
//! - **Event fan-out**: progress, completion, and failure events broadcast
//!   to any number of independent observers
//! - **Restart-safe**: completed downloads persist across relaunches, and
//!   transfers that survived in the engine are picked back up
//! - **Engine-agnostic**: the actual segmented transfer, file layout,
//!   playability check, and settings encoding all live behind traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hls_dl::{
//!     DownloadKey, Downloader, JsonFileSettings, SessionConfig, SimulatedEngine,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A real application passes its transfer engine here; the
//!     // simulated engine stands in for one.
//!     let (engine, updates) = SimulatedEngine::new();
//!     let settings = Arc::new(JsonFileSettings::new("downloads.json"));
//!
//!     let downloader = Downloader::new(
//!         SessionConfig::default(),
//!         engine,
//!         updates,
//!         settings,
//!     )?;
//!     downloader.restore_pending().await;
//!
//!     // Track one asset and start downloading it.
//!     let key = DownloadKey::parse("https://host/0/314/fullMatch.m3u8")?;
//!     let handle = downloader.handle(key);
//!     let mut status = handle.subscribe();
//!     handle.start("Full Match").await?;
//!
//!     while status.changed().await.is_ok() {
//!         println!("status: {:?}", *status.borrow());
//!     }
//!     Ok(())
//! }
//! ```

// Modules
pub mod bus;
pub mod config;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod handle;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod settings;
pub mod store;

// Re-exports for convenience
pub use bus::{EventBus, DEFAULT_EVENT_CAPACITY};
pub use config::{SessionConfig, DEFAULT_REGISTRY_KEY};
pub use downloader::Downloader;
pub use engine::{SimulatedEngine, SimulatedTask, TransferEngine, TransferTask, TransferUpdate};
pub use error::{DownloadError, Result};
pub use handle::DownloadHandle;
pub use protocol::{DownloadEvent, DownloadKey, DownloadStatus, TimeRange};
pub use registry::DownloadRegistry;
pub use session::DownloadSession;
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use store::{AssetVerifier, FileStore, LocalFileStore, PlayableAsset};
