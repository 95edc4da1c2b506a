//! Download events
//!
//! Events published on the [`EventBus`](crate::bus::EventBus), each tagged
//! with the originating key. Immutable once published.

use super::types::DownloadKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events emitted for logical downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DownloadEvent {
    /// Progress update for an in-flight transfer
    Progress { key: DownloadKey, percent: f64 },
    /// Transfer completed; the asset now lives at `location`
    Completed { key: DownloadKey, location: PathBuf },
    /// Transfer failed; any partial file has been cleaned up
    Failed { key: DownloadKey, error: String },
}

impl DownloadEvent {
    /// The key this event belongs to, for subscriber-side filtering
    pub fn key(&self) -> &DownloadKey {
        match self {
            Self::Progress { key, .. } => key,
            Self::Completed { key, .. } => key,
            Self::Failed { key, .. } => key,
        }
    }
}
