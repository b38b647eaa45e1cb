//! REST handlers for the COVID forecast API.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use covcast_models::CacheStats;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::error::HttpError;
use crate::forecast::{ForecastPoint, PersistedModelInfo};

fn default_region() -> String {
    "FRA".to_string()
}

/// Request body for `POST /api/v1/covid/predict`.
#[derive(Debug, Deserialize)]
pub struct PredictionBody {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_region")]
    pub region: String,
}

/// One day of the prediction response; case counts are whole numbers.
#[derive(Debug, Serialize)]
pub struct PredictionEntry {
    pub date: NaiveDate,
    pub cases: i64,
    pub predicted: bool,
}

impl From<ForecastPoint> for PredictionEntry {
    fn from(point: ForecastPoint) -> Self {
        Self { date: point.date, cases: point.value.round() as i64, predicted: point.predicted }
    }
}

#[derive(Debug, Serialize)]
pub struct Predictions {
    pub predictions: Vec<PredictionEntry>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub status: &'static str,
    pub body: Predictions,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub library: Vec<String>,
    pub stats: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct PersistedModelsResponse {
    pub models: Vec<PersistedModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Forecast a region over a date range.
/// POST /api/v1/covid/predict
pub async fn predict(
    State(state): State<AppState>,
    Json(body): Json<PredictionBody>,
) -> Result<Json<PredictionResponse>, HttpError> {
    let end = body.end_date.unwrap_or_else(|| state.service.default_end(body.start_date));
    let invalid =
        state.validator.check_all(body.start_date, end, &body.region, true, state.today());
    if !invalid.is_empty() {
        return Err(HttpError::Unprocessable(invalid));
    }

    let timeline =
        state.service.resolve_and_forecast(&body.region, body.start_date, Some(end)).await?;

    Ok(Json(PredictionResponse {
        status: "OK",
        body: Predictions { predictions: timeline.into_iter().map(Into::into).collect() },
    }))
}

/// Retrain and persist the model of a region.
/// GET|POST /api/v1/covid/update/:region
pub async fn update_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<StatusCode, HttpError> {
    if !state.validator.check_region(&region) {
        return Err(HttpError::Unprocessable(vec![crate::validation::InvalidParameter {
            field: "region".to_string(),
            message: format!("Selected region {region} is not available"),
        }]));
    }

    let summary = state.service.train_region(&region).await?;
    info!(
        model = %summary.identity,
        last_true_date = %summary.last_true_date,
        "Region model updated"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Keys of the models currently cached, with the cache counters.
/// GET /api/v1/covid/library
pub async fn library(State(state): State<AppState>) -> Json<LibraryResponse> {
    let library = state.service.cached_models().iter().map(|id| id.key()).collect();
    Json(LibraryResponse { library, stats: state.service.cache().stats() })
}

/// Drop a region's model from the cache.
/// DELETE /api/v1/covid/library/:region
pub async fn evict(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<StatusCode, HttpError> {
    state.service.evict(&region)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Models with a persisted record.
/// GET /api/v1/covid/models
pub async fn persisted_models(
    State(state): State<AppState>,
) -> Result<Json<PersistedModelsResponse>, HttpError> {
    let models = state.service.persisted_models().await?;
    Ok(Json(PersistedModelsResponse { models }))
}

/// Delete a region's persisted model; it is also dropped from the cache.
/// DELETE /api/v1/covid/models/:region
pub async fn delete_persisted(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<StatusCode, HttpError> {
    state.service.delete_persisted(&region).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
