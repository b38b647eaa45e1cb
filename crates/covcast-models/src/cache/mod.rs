//! Model caching for fitted forecasting models.
//!
//! Restoring a model from the store is slow, so fitted instances are kept in a
//! bounded in-memory cache and the least-recently-used one is evicted when the
//! cache is full.

pub mod cache;
pub mod config;
pub mod types;

pub use cache::{CacheError, ModelCache};
pub use config::{CacheConfig, CacheConfigError};
pub use types::{CacheStats, CachedModel};
