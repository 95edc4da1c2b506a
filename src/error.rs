//! Typed errors for hls-dl
//!
//! Asynchronous transfer failures never surface here: they are converted
//! into [`DownloadEvent::Failed`](crate::protocol::DownloadEvent) events so
//! they can fan out to every observer. This enum covers the synchronous
//! failure channels only.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the download coordinator
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Deleting a downloaded (or partially downloaded) file failed.
    ///
    /// A file that is already absent is *not* an error; removal of the
    /// registry entry proceeds regardless.
    #[error("file delete failed at {path:?}: {message}")]
    FileDelete { path: PathBuf, message: String },

    /// Storage/filesystem errors outside of deletion
    #[error("storage error at {path:?}: {message}")]
    Storage { path: PathBuf, message: String },

    /// A download key that is not a valid http/https URL
    #[error("invalid download key '{input}': {message}")]
    InvalidKey { input: String, message: String },

    /// Invalid configuration value
    #[error("invalid configuration for '{field}': {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    /// Session is shutting down
    #[error("session is shutting down")]
    Shutdown,
}

impl DownloadError {
    /// Create a file-deletion error
    pub fn file_delete(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileDelete {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-key error
    pub fn invalid_key(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-config error
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for coordinator operations
pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}
