//! REST server for covcast Core.
//!
//! Routes:
//! - `POST /api/v1/covid/predict`
//! - `GET|POST /api/v1/covid/update/:region`
//! - `GET /api/v1/covid/library`, `DELETE /api/v1/covid/library/:region`
//! - `GET /api/v1/covid/models`
//! - `GET /health`

pub mod error;
pub mod handlers;
pub mod logging;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use chrono::{NaiveDate, Utc};
use covcast_models::ModelCache;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bootstrap::build_service;
use crate::config::Config;
use crate::error::Result;
use crate::forecast::ForecastService;
use crate::validation::RequestValidator;
use logging::RequestLoggerLayer;

/// Everything a handler needs, constructed once at startup.
pub struct AppContext {
    pub service: ForecastService,
    pub validator: RequestValidator,
    fixed_today: Option<NaiveDate>,
}

impl AppContext {
    #[must_use]
    pub fn new(service: ForecastService, validator: RequestValidator) -> Self {
        Self { service, validator, fixed_today: None }
    }

    /// Pins the date used by request validation.
    #[must_use]
    pub fn with_fixed_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.fixed_today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Application state shared across all handlers.
pub type AppState = Arc<AppContext>;

/// Builds the API router with request logging.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/covid/predict", post(handlers::predict))
        .route(
            "/api/v1/covid/update/:region",
            get(handlers::update_region).post(handlers::update_region),
        )
        .route("/api/v1/covid/library", get(handlers::library))
        .route("/api/v1/covid/library/:region", delete(handlers::evict))
        .route("/api/v1/covid/models", get(handlers::persisted_models))
        .route("/api/v1/covid/models/:region", delete(handlers::delete_persisted))
        .route("/health", get(handlers::health))
        .layer(RequestLoggerLayer)
        .with_state(state)
}

/// Periodically drops models idle longer than the cache's inactivity timeout.
pub fn spawn_cache_cleanup(cache: Arc<ModelCache>) -> JoinHandle<()> {
    let period = cache.config().cleanup_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = cache.evict_inactive();
            let stats = cache.stats();
            if evicted.is_empty() {
                debug!(
                    cache_size = stats.cache_size,
                    hits = stats.total_hits,
                    misses = stats.total_misses,
                    "Cache cleanup found no idle models"
                );
            } else {
                info!(
                    count = evicted.len(),
                    cache_size = stats.cache_size,
                    total_evictions = stats.total_evictions,
                    "Evicted idle models"
                );
            }
        }
    })
}

/// Start the REST server and run until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the service cannot be built or the address cannot be bound.
pub async fn run(config: &Config) -> Result<()> {
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Start the REST server and run until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the service cannot be built or the address cannot be bound.
pub async fn run_with_shutdown<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = build_service(config)?;
    let cleanup = spawn_cache_cleanup(Arc::clone(service.cache()));
    let state = Arc::new(AppContext::new(service, RequestValidator::new(config.validation.clone())));

    let listener = TcpListener::bind(config.server.address).await?;
    info!(address = %listener.local_addr()?, "covcast REST server started");

    let served = axum::serve(listener, build_router(state)).with_graceful_shutdown(shutdown).await;
    cleanup.abort();
    info!("covcast REST server stopped");
    served?;
    Ok(())
}
