//! Coordinator configuration

use crate::error::{DownloadError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings-store key the registry blob is persisted under by default
pub const DEFAULT_REGISTRY_KEY: &str = "downloaded_files";

/// Configuration for a download coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base directory that relative recorded asset paths resolve against
    pub base_dir: PathBuf,

    /// Settings-store key under which the completion registry persists its
    /// URL→path mapping
    pub registry_key: String,

    /// Events buffered per lagging event-bus subscriber
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            event_capacity: crate::bus::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.registry_key.is_empty() {
            return Err(DownloadError::invalid_config(
                "registry_key",
                "must not be empty",
            ));
        }
        if self.event_capacity == 0 {
            return Err(DownloadError::invalid_config(
                "event_capacity",
                "must be at least 1",
            ));
        }
        if self.base_dir.as_os_str().is_empty() {
            return Err(DownloadError::invalid_config(
                "base_dir",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_registry_key_is_rejected() {
        let config = SessionConfig {
            registry_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DownloadError::InvalidConfig {
                field: "registry_key",
                ..
            })
        ));
    }

    #[test]
    fn zero_event_capacity_is_rejected() {
        let config = SessionConfig {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
