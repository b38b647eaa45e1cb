//! Forecast orchestration: resolving a model for a region and stitching true
//! and predicted case counts into one timeline.

mod service;

pub use service::ForecastService;

use chrono::{DateTime, NaiveDate, Utc};
use covcast_abstraction::{ModelError, ModelIdentity, SeriesPoint};
use covcast_models::CacheError;
use serde::Serialize;
use thiserror::Error;

use crate::data::DataSourceError;

/// Errors surfaced by the forecast service.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No model has ever been trained for the region.
    #[error("No trained model available for region {0}")]
    ModelUnavailable(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A blocking fit or restore task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ForecastError {
    /// Maps a model error for `region`, surfacing a missing record as unavailability.
    pub(crate) fn from_model(region: &str, err: ModelError) -> Self {
        match err {
            ModelError::ModelNotFound(_) => Self::ModelUnavailable(region.to_string()),
            other => Self::Model(other),
        }
    }
}

/// One day of a forecast response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// `false` for observed data, `true` for model output.
    pub predicted: bool,
}

impl ForecastPoint {
    #[must_use]
    pub const fn observed(point: SeriesPoint) -> Self {
        Self { date: point.date, value: point.value, predicted: false }
    }

    #[must_use]
    pub const fn predicted(point: SeriesPoint) -> Self {
        Self { date: point.date, value: point.value, predicted: true }
    }
}

/// Outcome of training one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingSummary {
    pub identity: ModelIdentity,
    pub last_true_date: NaiveDate,
    /// Number of observations the model was fitted on.
    pub observations: usize,
    /// Whether a cached instance was replaced by the new fit.
    pub replaced_cached: bool,
}

/// A model found in the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedModelInfo {
    pub identity: ModelIdentity,
    pub key: String,
    pub last_true_date: NaiveDate,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_becomes_unavailable() {
        let err = ForecastError::from_model("59", ModelError::ModelNotFound("SARIMAX_59".into()));
        assert!(matches!(err, ForecastError::ModelUnavailable(r) if r == "59"));

        let err = ForecastError::from_model("59", ModelError::UnfittedModel);
        assert!(matches!(err, ForecastError::Model(ModelError::UnfittedModel)));
    }

    #[test]
    fn test_forecast_point_serializes_date_as_iso() {
        let point = ForecastPoint::predicted(SeriesPoint::new(
            NaiveDate::from_ymd_opt(2022, 1, 11).unwrap(),
            42.5,
        ));
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["date"], "2022-01-11");
        assert_eq!(json["predicted"], true);
    }
}
