//! Seasonal autoregressive forecasting backend.
//!
//! The training series is reindexed to one value per day, seasonally
//! differenced with period `s`:
//!
//! ```text
//! z[t] = y[t] - y[t - s]
//! ```
//!
//! and an AR(1) with constant, `z[t] = c + phi * z[t - 1]`, is fitted on the
//! differenced series by ordinary least squares. Forecasts undo the
//! differencing recursively from the last observed day.

use chrono::{Days, NaiveDate, Utc};
use covcast_abstraction::{
    DateRange, ForecastModel, ModelError, ModelIdentity, ModelStore, PersistedModel, Series,
    SeriesPoint,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ModelKind;

/// Hyperparameters for [`SeasonalArModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitParams {
    /// Seasonal differencing period in days (default: 7).
    #[serde(default = "default_seasonal_period")]
    pub seasonal_period: usize,

    /// Only the most recent days are used for fitting (default: 730).
    #[serde(default = "default_max_history_days")]
    pub max_history_days: usize,
}

fn default_seasonal_period() -> usize {
    7
}

fn default_max_history_days() -> usize {
    730
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            seasonal_period: default_seasonal_period(),
            max_history_days: default_max_history_days(),
        }
    }
}

impl FitParams {
    /// Fewest daily values that leave two lagged pairs after differencing.
    #[must_use]
    pub const fn min_days(&self) -> usize {
        self.seasonal_period + 3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    first_date: NaiveDate,
    period: usize,
    constant: f64,
    phi: f64,
    /// Daily training values from `first_date` to the last true date.
    history: Vec<f64>,
}

impl FittedState {
    fn last_true_date(&self) -> NaiveDate {
        self.first_date + Days::new(self.history.len() as u64 - 1)
    }

    /// One-step prediction of `y[t]` from the values before `t`.
    ///
    /// Requires `t > period`.
    fn one_step(&self, y: &[f64], t: usize) -> f64 {
        let s = self.period;
        y[t - s] + self.constant + self.phi * (y[t - 1] - y[t - 1 - s])
    }

    /// History followed by `horizon` recursively forecast days.
    fn extend(&self, horizon: usize) -> Vec<f64> {
        let mut y = Vec::with_capacity(self.history.len() + horizon);
        y.extend_from_slice(&self.history);
        for _ in 0..horizon {
            let next = self.one_step(&y, y.len());
            y.push(next);
        }
        y
    }
}

/// Seasonal AR(1) model for one region (identity kind `SARIMAX`).
#[derive(Debug, Clone)]
pub struct SeasonalArModel {
    identity: ModelIdentity,
    params: FitParams,
    state: Option<FittedState>,
}

impl SeasonalArModel {
    /// Creates an unfitted model for `region`.
    #[must_use]
    pub fn new(region: impl Into<String>, params: FitParams) -> Self {
        Self { identity: ModelIdentity::new(ModelKind::SeasonalAr.as_str(), region), params, state: None }
    }

    /// The fitted `(constant, phi)` pair, if fitted.
    #[must_use]
    pub fn coefficients(&self) -> Option<(f64, f64)> {
        self.state.as_ref().map(|s| (s.constant, s.phi))
    }
}

/// Sorts the series and fills it to one value per day.
///
/// Missing days carry the previous value forward; for duplicated dates the
/// later point wins.
fn reindex_daily(training: &[SeriesPoint]) -> Result<(NaiveDate, Vec<f64>), ModelError> {
    let mut points = training.to_vec();
    points.sort_by_key(|p| p.date);

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(ModelError::Fit("training series is empty".to_string()));
    };
    let first_date = first.date;
    let len = (last.date - first_date).num_days() as usize + 1;

    let mut slots: Vec<Option<f64>> = vec![None; len];
    for p in &points {
        if !p.value.is_finite() {
            return Err(ModelError::Fit(format!("non-finite value on {}", p.date)));
        }
        slots[(p.date - first_date).num_days() as usize] = Some(p.value);
    }

    let mut values = Vec::with_capacity(len);
    let mut carry = first.value;
    for slot in slots {
        if let Some(v) = slot {
            carry = v;
        }
        values.push(carry);
    }
    Ok((first_date, values))
}

/// Least-squares fit of `z[t] = c + phi * z[t - 1]`.
fn fit_ar1(z: &[f64]) -> Result<(f64, f64), ModelError> {
    let xs = &z[..z.len() - 1];
    let ys = &z[1..];
    let m = xs.len() as f64;

    let mean_x = xs.iter().sum::<f64>() / m;
    let mean_y = ys.iter().sum::<f64>() / m;
    let (sxx, sxy) = xs.iter().zip(ys).fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });

    // A constant lag carries no autoregressive signal.
    let phi = if sxx < f64::EPSILON { 0.0 } else { sxy / sxx };
    let constant = mean_y - phi * mean_x;

    if !phi.is_finite() || !constant.is_finite() {
        return Err(ModelError::Fit("least squares did not converge".to_string()));
    }
    if phi.abs() >= 1.0 {
        return Err(ModelError::Fit(format!("non-stationary autoregression (phi = {phi:.4})")));
    }
    Ok((constant, phi))
}

impl ForecastModel for SeasonalArModel {
    fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn last_true_date(&self) -> Option<NaiveDate> {
        self.state.as_ref().map(FittedState::last_true_date)
    }

    fn fit(&mut self, training: &[SeriesPoint]) -> Result<(), ModelError> {
        let period = self.params.seasonal_period;
        if period == 0 {
            return Err(ModelError::Fit("seasonal period must be at least 1".to_string()));
        }

        let (mut first_date, mut values) = reindex_daily(training)?;
        if self.params.max_history_days > 0 && values.len() > self.params.max_history_days {
            let skip = values.len() - self.params.max_history_days;
            values.drain(..skip);
            first_date = first_date + Days::new(skip as u64);
        }

        if values.len() < self.params.min_days() {
            return Err(ModelError::Fit(format!(
                "need at least {} days of data, got {}",
                self.params.min_days(),
                values.len()
            )));
        }

        let z: Vec<f64> = (period..values.len()).map(|t| values[t] - values[t - period]).collect();
        let (constant, phi) = fit_ar1(&z)?;

        let state = FittedState { first_date, period, constant, phi, history: values };
        info!(
            model = %self.identity,
            days = state.history.len(),
            last_true_date = %state.last_true_date(),
            constant,
            phi,
            "Fitted seasonal AR model"
        );
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, start: NaiveDate, end: NaiveDate) -> Result<Series, ModelError> {
        let range = DateRange::new(start, end)?;
        let state = self.state.as_ref().ok_or(ModelError::UnfittedModel)?;

        let n = state.history.len();
        let end_idx = (end - state.first_date).num_days();
        let horizon = usize::try_from(end_idx + 1).map_or(0, |len| len.saturating_sub(n));
        let path = state.extend(horizon);

        debug!(model = %self.identity, %start, %end, horizon, "Predicting");

        let points = range
            .days()
            .map(|date| {
                let value = match usize::try_from((date - state.first_date).num_days()) {
                    // Before the training window: no backcast, hold the first value.
                    Err(_) => path[0],
                    Ok(i) if i < n && i > state.period => state.one_step(&state.history, i),
                    Ok(i) => path[i],
                };
                SeriesPoint::new(date, value.max(0.0))
            })
            .collect();
        Ok(points)
    }

    fn save(&self, store: &dyn ModelStore) -> Result<(), ModelError> {
        let state = self.state.as_ref().ok_or(ModelError::UnfittedModel)?;
        let bytes =
            serde_json::to_vec(state).map_err(|e| ModelError::Serialization(e.to_string()))?;

        store.write(&PersistedModel {
            identity: self.identity.clone(),
            last_true_date: state.last_true_date(),
            saved_at: Utc::now(),
            state: bytes,
        })
    }

    fn restore(&mut self, store: &dyn ModelStore) -> Result<(), ModelError> {
        let record = store.read(&self.identity)?;
        let state: FittedState = serde_json::from_slice(&record.state)
            .map_err(|e| ModelError::Serialization(e.to_string()))?;

        if state.period == 0
            || state.history.len() <= state.period
            || state.last_true_date() != record.last_true_date
        {
            return Err(ModelError::Storage(format!(
                "persisted state for {} does not match its metadata",
                self.identity
            )));
        }

        info!(model = %self.identity, last_true_date = %record.last_true_date, "Restored model");
        self.state = Some(state);
        Ok(())
    }
}
