//! Checks applied to forecast and training requests before they reach the service.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::config::ValidationConfig;

/// A request field that failed a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidParameter {
    pub field: String,
    pub message: String,
}

impl InvalidParameter {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

/// Validates request parameters against the configured bounds.
///
/// Every check takes `today` explicitly so callers decide the clock.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    config: ValidationConfig,
}

impl RequestValidator {
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn check_region(&self, region: &str) -> bool {
        self.config.available_regions.iter().any(|r| r == region)
    }

    pub fn check_start_date(&self, start: NaiveDate) -> bool {
        start >= self.config.earliest_start
    }

    pub fn check_end_date(&self, end: NaiveDate, today: NaiveDate) -> bool {
        today
            .checked_add_days(Days::new(u64::from(self.config.max_days_ahead)))
            .is_none_or(|latest| end <= latest)
    }

    pub fn check_dates_order(start: NaiveDate, end: NaiveDate) -> bool {
        start <= end
    }

    /// The earliest start a prediction may use, if a bound is configured.
    pub fn earliest_predict_start(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.config
            .max_days_behind
            .and_then(|behind| today.checked_sub_days(Days::new(u64::from(behind))))
    }

    pub fn check_predict_start(&self, start: NaiveDate, today: NaiveDate) -> bool {
        self.earliest_predict_start(today).is_none_or(|earliest| start >= earliest)
    }

    /// Runs every check and returns the violated ones, empty if the request is valid.
    ///
    /// `prediction` enables the lower bound on the start date.
    pub fn check_all(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        region: &str,
        prediction: bool,
        today: NaiveDate,
    ) -> Vec<InvalidParameter> {
        let mut invalid = Vec::new();

        if !self.check_region(region) {
            invalid.push(InvalidParameter::new(
                "region",
                format!("Selected region {region} is not available"),
            ));
        }
        if !self.check_start_date(start) {
            invalid.push(InvalidParameter::new(
                "start_date",
                format!("Start date is before {}", self.config.earliest_start),
            ));
        }
        if !self.check_end_date(end, today) {
            invalid.push(InvalidParameter::new(
                "end_date",
                "End date is too late in the future, predictions would not be precise",
            ));
        }
        if !Self::check_dates_order(start, end) {
            invalid.push(InvalidParameter::new("end_date", "End date is before start date"));
        }
        if prediction && !self.check_predict_start(start, today) {
            if let Some(earliest) = self.earliest_predict_start(today) {
                invalid.push(InvalidParameter::new(
                    "start_date",
                    format!("Start date cannot be before {earliest}"),
                ));
            }
        }

        invalid
    }
}
