//! Configuration for model caching.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration for the model cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of models to keep in memory (default: 3, one per served region).
    #[serde(default = "default_max_capacity")]
    pub max_capacity: usize,

    /// Seconds before unused models are evicted (default: 1800 = 30 minutes).
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// How often the cleanup task runs in seconds (default: 300 = 5 minutes).
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_max_capacity() -> usize {
    3
}

fn default_inactivity_timeout_secs() -> u64 {
    1800 // 30 minutes
}

fn default_cleanup_interval_secs() -> u64 {
    300 // 5 minutes
}

/// Errors that can occur during cache configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Invalid max capacity (must be > 0).
    #[error("Invalid max capacity: must be greater than 0")]
    InvalidMaxCapacity,

    /// Invalid inactivity timeout (must be > 0).
    #[error("Invalid inactivity timeout: must be greater than 0")]
    InvalidInactivityTimeout,

    /// Invalid cleanup interval (must be > 0).
    #[error("Invalid cleanup interval: must be greater than 0")]
    InvalidCleanupInterval,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// Default configuration with the given capacity.
    #[must_use]
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self { max_capacity, ..Self::default() }
    }

    /// Validate the cache configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.max_capacity == 0 {
            return Err(CacheConfigError::InvalidMaxCapacity);
        }

        if self.inactivity_timeout_secs == 0 {
            return Err(CacheConfigError::InvalidInactivityTimeout);
        }

        if self.cleanup_interval_secs == 0 {
            return Err(CacheConfigError::InvalidCleanupInterval);
        }

        Ok(())
    }

    /// Get the inactivity timeout as a Duration.
    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    /// Get the cleanup interval as a Duration.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}
