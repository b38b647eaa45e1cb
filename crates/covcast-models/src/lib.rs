//! Forecasting model implementations for covcast.
//!
//! This crate provides concrete implementations of the `ForecastModel` trait
//! and the in-memory [`ModelCache`] that serves them.
//!
//! # Supported Backends
//!
//! - **SARIMAX**: seasonally differenced AR(1) with constant, fitted by least squares
//! - **Mock**: carries the last observation forward, for testing and development

pub mod cache;
pub mod factory;
pub mod seasonal;

use chrono::{NaiveDate, Utc};
use covcast_abstraction::{
    DateRange, ForecastModel, ModelError, ModelIdentity, ModelStore, PersistedModel, Series,
    SeriesPoint,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use cache::{CacheConfig, CacheConfigError, CacheError, CacheStats, CachedModel, ModelCache};
pub use factory::{ModelFactory, ModelKind};
pub use seasonal::{FitParams, SeasonalArModel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct MockState {
    last_true_date: NaiveDate,
    last_value: f64,
}

/// A mock implementation of the `ForecastModel` trait for testing and demonstration.
///
/// Every predicted day carries the last training value.
#[derive(Debug, Clone)]
pub struct MockModel {
    identity: ModelIdentity,
    state: Option<MockState>,
}

impl MockModel {
    /// Creates an unfitted `MockModel` for the given region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self { identity: ModelIdentity::new(ModelKind::Mock.as_str(), region), state: None }
    }
}

impl ForecastModel for MockModel {
    fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn last_true_date(&self) -> Option<NaiveDate> {
        self.state.map(|s| s.last_true_date)
    }

    fn fit(&mut self, training: &[SeriesPoint]) -> Result<(), ModelError> {
        let last = training
            .iter()
            .max_by_key(|p| p.date)
            .ok_or_else(|| ModelError::Fit("training series is empty".to_string()))?;

        debug!(model = %self.identity, points = training.len(), "MockModel fitting");
        self.state = Some(MockState { last_true_date: last.date, last_value: last.value });
        Ok(())
    }

    fn predict(&self, start: NaiveDate, end: NaiveDate) -> Result<Series, ModelError> {
        let range = DateRange::new(start, end)?;
        let state = self.state.ok_or(ModelError::UnfittedModel)?;
        Ok(range.days().map(|d| SeriesPoint::new(d, state.last_value)).collect())
    }

    fn save(&self, store: &dyn ModelStore) -> Result<(), ModelError> {
        let state = self.state.ok_or(ModelError::UnfittedModel)?;
        let bytes =
            serde_json::to_vec(&state).map_err(|e| ModelError::Serialization(e.to_string()))?;
        store.write(&PersistedModel {
            identity: self.identity.clone(),
            last_true_date: state.last_true_date,
            saved_at: Utc::now(),
            state: bytes,
        })
    }

    fn restore(&mut self, store: &dyn ModelStore) -> Result<(), ModelError> {
        let record = store.read(&self.identity)?;
        let mut state: MockState = serde_json::from_slice(&record.state)
            .map_err(|e| ModelError::Serialization(e.to_string()))?;
        state.last_true_date = record.last_true_date;
        self.state = Some(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covcast_store::MemoryModelStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, d).unwrap()
    }

    #[test]
    fn test_mock_fit_sets_last_true_date() {
        let mut model = MockModel::new("FRA");
        assert!(!model.is_fitted());
        assert_eq!(model.last_true_date(), None);

        model
            .fit(&[SeriesPoint::new(day(2), 5.0), SeriesPoint::new(day(4), 8.0)])
            .unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.last_true_date(), Some(day(4)));
        assert_eq!(model.predict(day(5), day(6)).unwrap()[1], SeriesPoint::new(day(6), 8.0));
    }

    #[test]
    fn test_mock_rejects_empty_series() {
        let mut model = MockModel::new("FRA");
        assert!(matches!(model.fit(&[]), Err(ModelError::Fit(_))));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_mock_save_restore() {
        let store = MemoryModelStore::new();
        let mut model = MockModel::new("59");
        model.fit(&[SeriesPoint::new(day(9), 3.0)]).unwrap();
        model.save(&store).unwrap();

        let mut restored = MockModel::new("59");
        restored.restore(&store).unwrap();
        assert_eq!(restored.last_true_date(), Some(day(9)));
        assert_eq!(
            restored.predict(day(10), day(12)).unwrap(),
            model.predict(day(10), day(12)).unwrap()
        );
    }
}
