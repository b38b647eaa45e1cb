//! Sources of true case counts used to train models.

mod remote;

pub use remote::CsvDataSource;

use std::collections::HashMap;

use async_trait::async_trait;
use covcast_abstraction::{DateRange, Series, SeriesPoint};
use thiserror::Error;

/// Errors raised while fetching or parsing a case-count dataset.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Transport failure talking to the dataset host.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The dataset host answered with a non-success status.
    #[error("Dataset request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The payload is not valid semicolon-separated CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A row holds an unparseable date or value.
    #[error("Invalid row {line}: {message}")]
    InvalidRow { line: u64, message: String },

    /// The dataset holds no rows for the region.
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// No dataset URL is configured for the region.
    #[error("No dataset configured for region {0}")]
    NotConfigured(String),
}

/// A provider of daily case counts per region.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns the region's series sorted by date, one point per date,
    /// restricted to `range` when given.
    async fn fetch_series(
        &self,
        region: &str,
        range: Option<DateRange>,
    ) -> Result<Series, DataSourceError>;
}

/// Sorts by date, keeps the last value for duplicated dates and applies `range`.
pub(crate) fn normalize(mut series: Series, range: Option<DateRange>) -> Series {
    series.sort_by_key(|p| p.date);
    let mut out: Series = Vec::with_capacity(series.len());
    for point in series {
        match out.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => out.push(point),
        }
    }
    if let Some(range) = range {
        out.retain(|p| range.contains(p.date));
    }
    out
}

/// In-memory data source keyed by region.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    series: HashMap<String, Series>,
}

impl StaticDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_series(mut self, region: impl Into<String>, series: Series) -> Self {
        self.insert(region, series);
        self
    }

    pub fn insert(&mut self, region: impl Into<String>, series: Series) {
        self.series.insert(region.into(), series);
    }

    /// Builds a series of consecutive days starting at `start`.
    #[must_use]
    pub fn daily(start: chrono::NaiveDate, values: &[f64]) -> Series {
        start
            .iter_days()
            .zip(values)
            .map(|(date, value)| SeriesPoint::new(date, *value))
            .collect()
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn fetch_series(
        &self,
        region: &str,
        range: Option<DateRange>,
    ) -> Result<Series, DataSourceError> {
        let series = self
            .series
            .get(region)
            .ok_or_else(|| DataSourceError::UnknownRegion(region.to_string()))?;
        Ok(normalize(series.clone(), range))
    }
}
