//! Configuration module for covcast Core.

mod loader;

pub use loader::{ConfigError, DEFAULT_CONFIG_FILE};

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;
use covcast_models::{CacheConfig, FitParams, ModelKind};
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// The address to bind the REST server to.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
}

fn default_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: default_address() }
    }
}

/// Where true case counts come from.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DataConfig {
    /// Semicolon-separated per-department dataset.
    #[serde(default)]
    pub regional_url: Option<String>,
    /// Semicolon-separated national dataset, served for `national_region`.
    #[serde(default)]
    pub national_url: Option<String>,
    /// Region code answered from the national dataset.
    #[serde(default = "default_national_region")]
    pub national_region: String,
    #[serde(default = "default_region_column")]
    pub region_column: String,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
    #[serde(default = "default_age_column")]
    pub age_column: String,
    /// Only rows of this age class are kept ("0" is all ages).
    #[serde(default = "default_age_class")]
    pub age_class: String,
    /// How long a downloaded dataset is reused (default: 3600).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_national_region() -> String {
    "FRA".to_string()
}

fn default_region_column() -> String {
    "dep".to_string()
}

fn default_date_column() -> String {
    "jour".to_string()
}

fn default_value_column() -> String {
    "P".to_string()
}

fn default_age_column() -> String {
    "cl_age90".to_string()
}

fn default_age_class() -> String {
    "0".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            regional_url: None,
            national_url: None,
            national_region: default_national_region(),
            region_column: default_region_column(),
            date_column: default_date_column(),
            value_column: default_value_column(),
            age_column: default_age_column(),
            age_class: default_age_class(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Bounds applied to incoming forecast requests.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ValidationConfig {
    #[serde(default = "default_available_regions")]
    pub available_regions: Vec<String>,
    /// First day a request may start on.
    #[serde(default = "default_earliest_start")]
    pub earliest_start: NaiveDate,
    /// How far past today a request may end.
    #[serde(default = "default_max_days_ahead")]
    pub max_days_ahead: u32,
    /// If set, requests may not start more than this many days before today.
    #[serde(default)]
    pub max_days_behind: Option<u32>,
}

fn default_available_regions() -> Vec<String> {
    vec!["FRA".to_string(), "59".to_string(), "62".to_string()]
}

fn default_earliest_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, 1).unwrap_or_default()
}

fn default_max_days_ahead() -> u32 {
    90
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            available_regions: default_available_regions(),
            earliest_start: default_earliest_start(),
            max_days_ahead: default_max_days_ahead(),
            max_days_behind: None,
        }
    }
}

/// Forecasting backend selection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ModelSection {
    /// Backend used for every region (default: sarimax).
    #[serde(default)]
    pub kind: ModelKind,
    #[serde(flatten)]
    pub fit: FitParams,
    /// Horizon used when a request omits its end date (default: 5).
    #[serde(default = "default_horizon_days")]
    pub default_horizon_days: u64,
}

fn default_horizon_days() -> u64 {
    5
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            fit: FitParams::default(),
            default_horizon_days: default_horizon_days(),
        }
    }
}

/// Persisted model storage.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Data directory; models live in `<data_dir>/models`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

/// Root configuration for covcast.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
