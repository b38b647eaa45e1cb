//! covcast Core - COVID case-count forecasting service.
//!
//! This crate provides the service layer of covcast, including:
//! - Configuration management (TOML file plus environment overrides)
//! - The case-count data source
//! - Request validation
//! - The forecast orchestrator backed by the model cache
//! - The REST server
//!
//! # Example
//!
//! ```rust,no_run
//! use covcast_core::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> covcast_core::error::Result<()> {
//!     let config = Config::load(None)?;
//!     server::run(&config).await
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod server;
pub mod validation;

pub use bootstrap::{build_service, build_service_with_source};
pub use config::{Config, ConfigError};
pub use data::{CsvDataSource, DataSource, DataSourceError, StaticDataSource};
pub use error::{CovcastError, Result};
pub use forecast::{
    ForecastError, ForecastPoint, ForecastService, PersistedModelInfo, TrainingSummary,
};
pub use server::{AppContext, AppState, build_router};
pub use validation::{InvalidParameter, RequestValidator};
