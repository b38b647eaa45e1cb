//! Model abstraction layer for covcast.
//!
//! This crate defines the capability traits and shared types used by every
//! forecasting backend, the persisted model store and the model cache.

mod series;

pub use series::{DateRange, Series, SeriesPoint};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Represents an error that can occur while fitting, predicting or persisting a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Training failed: empty series or the fitting procedure did not converge.
    #[error("Fit Error: {0}")]
    Fit(String),

    /// `predict` was called before the model was fitted or restored.
    #[error("Model has not been fitted")]
    UnfittedModel,

    /// The requested end date is before the start date.
    #[error("Invalid range: end date {end} is before start date {start}")]
    InvalidRange {
        /// Requested first day.
        start: NaiveDate,
        /// Requested last day.
        end: NaiveDate,
    },

    /// No persisted state exists for the identity.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The persisted state exists but could not be read or written.
    #[error("Storage Error: {0}")]
    Storage(String),

    /// The fitted state could not be encoded or decoded.
    #[error("Serialization Error: {0}")]
    Serialization(String),
}

/// Stable identity of one cacheable model: one model kind for one region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelIdentity {
    /// The forecasting backend (e.g. "SARIMAX").
    pub kind: String,
    /// The region code (e.g. "FRA", "59").
    pub region: String,
}

impl ModelIdentity {
    /// Creates an identity from a model kind and a region code.
    #[must_use]
    pub fn new(kind: impl Into<String>, region: impl Into<String>) -> Self {
        Self { kind: kind.into(), region: region.into() }
    }

    /// The string key used for storage and listings (`SARIMAX_FRA`).
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.kind, self.region)
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.region)
    }
}

/// The persisted form of a fitted model.
///
/// The opaque fitted-state blob and the metadata (`last_true_date`) travel in a
/// single record so a store can only ever hold both or neither.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedModel {
    /// Identity the record belongs to.
    pub identity: ModelIdentity,
    /// Last date of real (non-forecast) training data.
    pub last_true_date: NaiveDate,
    /// When the record was produced.
    pub saved_at: DateTime<Utc>,
    /// Backend-specific fitted state.
    pub state: Vec<u8>,
}

/// Keyed read/write access to persisted model records.
pub trait ModelStore: Send + Sync {
    /// Writes the record for `record.identity`, replacing any previous one.
    ///
    /// # Errors
    /// Returns `ModelError::Storage` if the record cannot be written.
    fn write(&self, record: &PersistedModel) -> Result<(), ModelError>;

    /// Reads the record for `identity`.
    ///
    /// # Errors
    /// Returns `ModelError::ModelNotFound` if no record exists, or
    /// `ModelError::Storage` if the record is unreadable.
    fn read(&self, identity: &ModelIdentity) -> Result<PersistedModel, ModelError>;

    /// Lists the identities that currently have a record.
    ///
    /// # Errors
    /// Returns `ModelError::Storage` if the store cannot be enumerated.
    fn list(&self) -> Result<Vec<ModelIdentity>, ModelError>;

    /// Deletes the record for `identity`.
    ///
    /// # Errors
    /// Returns `ModelError::ModelNotFound` if no record exists.
    fn delete(&self, identity: &ModelIdentity) -> Result<(), ModelError>;
}

/// A fitted forecasting model for one region.
///
/// Any backend implementing this trait can be served by the cache and the
/// orchestrator. Implementations must keep `last_true_date()` set if and only
/// if `is_fitted()` is true. `fit`, `save` and `restore` may block on CPU or
/// disk and must not be called while holding the cache lock.
pub trait ForecastModel: Send + Sync {
    /// Returns the identity of this model.
    fn identity(&self) -> &ModelIdentity;

    /// Whether the model has been fitted or restored.
    fn is_fitted(&self) -> bool;

    /// Last date of the real training data, `None` until fitted or restored.
    fn last_true_date(&self) -> Option<NaiveDate>;

    /// Fits the model on a date-indexed series.
    ///
    /// Refitting an already fitted model overwrites its state.
    ///
    /// # Errors
    /// Returns `ModelError::Fit` if the series is empty or fitting fails.
    fn fit(&mut self, training: &[SeriesPoint]) -> Result<(), ModelError>;

    /// Produces one point per day over `[start, end]`.
    ///
    /// Does not default `end`; callers decide the horizon.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidRange` if `end < start` (checked first), then
    /// `ModelError::UnfittedModel` if the model is not fitted.
    fn predict(&self, start: NaiveDate, end: NaiveDate) -> Result<Series, ModelError>;

    /// Persists the fitted state and `last_true_date` as one record.
    ///
    /// # Errors
    /// Returns `ModelError::UnfittedModel` if there is nothing to save, or the
    /// store's error.
    fn save(&self, store: &dyn ModelStore) -> Result<(), ModelError>;

    /// Restores the fitted state and `last_true_date` from the store.
    ///
    /// # Errors
    /// Returns `ModelError::ModelNotFound` if no record exists for this identity.
    fn restore(&mut self, store: &dyn ModelStore) -> Result<(), ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_and_display_match() {
        let identity = ModelIdentity::new("SARIMAX", "FRA");
        assert_eq!(identity.key(), "SARIMAX_FRA");
        assert_eq!(identity.to_string(), identity.key());
    }

    #[test]
    fn test_identity_ordering_is_by_kind_then_region() {
        let a = ModelIdentity::new("SARIMAX", "59");
        let b = ModelIdentity::new("SARIMAX", "62");
        let c = ModelIdentity::new("MOCK", "FRA");
        assert!(a < b);
        assert!(c < a);
    }

    #[test]
    fn test_identity_serde() {
        let identity = ModelIdentity::new("SARIMAX", "62");
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, r#"{"kind":"SARIMAX","region":"62"}"#);
    }

    #[test]
    fn test_invalid_range_display() {
        let err = ModelError::InvalidRange {
            start: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 1, 5).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid range: end date 2022-01-05 is before start date 2022-01-10"
        );
    }
}
