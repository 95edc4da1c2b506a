//! Core protocol types
//!
//! Fundamental types used throughout the coordinator.

use crate::error::{DownloadError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identity of a logical download: the remote URL of the asset.
///
/// The key is the sole correlation identity across all components. It is
/// stored as the correlation tag on engine tasks, carried on every event,
/// and used as the lookup key in the completion registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadKey(Url);

impl DownloadKey {
    /// Parse a download key from a remote URL string.
    ///
    /// Only `http` and `https` URLs identify downloadable assets.
    pub fn parse(input: &str) -> Result<Self> {
        let url =
            Url::parse(input).map_err(|e| DownloadError::invalid_key(input, e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            scheme => Err(DownloadError::invalid_key(
                input,
                format!("unsupported scheme: {}", scheme),
            )),
        }
    }

    /// The key as a URL string, exactly as used for task correlation
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The underlying URL
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl std::fmt::Display for DownloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DownloadKey {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A span of media time reported by the transfer engine, in seconds.
///
/// Segmented transfers report progress as the set of time ranges loaded so
/// far against the total range expected to load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range in seconds
    pub start: f64,
    /// Duration of the range in seconds
    pub duration: f64,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// A range covering the first `duration` seconds
    pub fn from_duration(duration: f64) -> Self {
        Self {
            start: 0.0,
            duration,
        }
    }
}
