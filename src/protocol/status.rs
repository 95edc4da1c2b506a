//! Download status types
//!
//! The per-key status state machine observed through a
//! [`DownloadHandle`](crate::handle::DownloadHandle). Exactly one variant
//! holds at any instant for a given key.

use serde::{Deserialize, Serialize};

/// Current status of a logical download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Nothing is known about the asset: never started, not on disk
    Unspecified,
    /// Actively downloading, with the latest reported percent (0.0–100.0)
    Downloading { percent: f64 },
    /// A playable copy of the asset exists on disk.
    ///
    /// Terminal and persistent: backed by the registry and the file store,
    /// it takes precedence over any stale in-flight progress.
    Downloaded,
    /// The last transfer attempt failed
    Error { message: String },
}

impl DownloadStatus {
    /// Whether a playable copy exists on disk
    pub fn is_downloaded(&self) -> bool {
        matches!(self, Self::Downloaded)
    }

    /// Whether a transfer is currently reporting progress
    pub fn is_downloading(&self) -> bool {
        matches!(self, Self::Downloading { .. })
    }

    /// The reported percent, if downloading
    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Downloading { percent } => Some(*percent),
            _ => None,
        }
    }
}

impl Default for DownloadStatus {
    fn default() -> Self {
        Self::Unspecified
    }
}
