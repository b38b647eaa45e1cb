//! Composition root: the one place where concrete cache, store and data
//! source implementations are wired into a [`ForecastService`].

use std::sync::Arc;

use covcast_models::ModelCache;
use covcast_store::{FsModelStore, StoreLayout};
use tracing::info;

use crate::config::Config;
use crate::data::{CsvDataSource, DataSource};
use crate::error::Result;
use crate::forecast::ForecastService;

/// Builds the service with the filesystem store and the HTTP dataset source.
///
/// # Errors
///
/// Returns an error if the cache configuration is invalid, the store root
/// cannot be created or the HTTP client cannot be built.
pub fn build_service(config: &Config) -> Result<ForecastService> {
    let source = CsvDataSource::new(config.data.clone())?;
    build_service_with_source(config, Arc::new(source))
}

/// Builds the service with the filesystem store and a caller-provided source.
///
/// # Errors
///
/// Returns an error if the cache configuration is invalid or the store root
/// cannot be created.
pub fn build_service_with_source(
    config: &Config,
    source: Arc<dyn DataSource>,
) -> Result<ForecastService> {
    let cache = ModelCache::new(config.cache.clone())?;

    let layout = StoreLayout::for_data_dir(&config.store.data_dir);
    layout.ensure_root()?;
    info!(
        store = %layout.root().display(),
        capacity = config.cache.max_capacity,
        kind = %config.model.kind,
        "Forecast service initialised"
    );

    Ok(ForecastService::new(
        Arc::new(cache),
        Arc::new(FsModelStore::new(layout)),
        source,
        config.model.kind,
        config.model.fit,
    )
    .with_default_horizon(config.model.default_horizon_days))
}
