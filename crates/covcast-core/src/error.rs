//! Error types for covcast Core.

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataSourceError;
use crate::forecast::ForecastError;
use covcast_models::CacheConfigError;

/// Core error type for covcast operations outside a single request.
#[derive(Error, Debug)]
pub enum CovcastError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache construction errors
    #[error("Cache configuration error: {0}")]
    Cache(#[from] CacheConfigError),

    /// Data source construction errors
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Forecast service errors
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Model store errors
    #[error("Store error: {0}")]
    Store(#[from] covcast_store::StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for covcast operations.
pub type Result<T> = std::result::Result<T, CovcastError>;
