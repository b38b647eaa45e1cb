//! The forecast service shared by every request handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use covcast_abstraction::{DateRange, ForecastModel, ModelError, ModelIdentity, ModelStore};
use covcast_models::{FitParams, ModelCache, ModelFactory, ModelKind};
use tracing::{debug, info, instrument, warn};

use super::{ForecastError, ForecastPoint, PersistedModelInfo, TrainingSummary};
use crate::data::DataSource;

const DEFAULT_HORIZON_DAYS: u64 = 5;

/// Resolves models through the cache and answers forecast requests.
///
/// Fits and restores run on the blocking pool without holding the cache lock.
/// Two concurrent misses for one region may both restore; the second `put`
/// simply replaces the first.
pub struct ForecastService {
    cache: Arc<ModelCache>,
    store: Arc<dyn ModelStore>,
    source: Arc<dyn DataSource>,
    kind: ModelKind,
    params: FitParams,
    default_horizon_days: u64,
}

impl ForecastService {
    pub fn new(
        cache: Arc<ModelCache>,
        store: Arc<dyn ModelStore>,
        source: Arc<dyn DataSource>,
        kind: ModelKind,
        params: FitParams,
    ) -> Self {
        Self {
            cache,
            store,
            source,
            kind,
            params,
            default_horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }

    /// Sets the horizon used when a request has no end date.
    #[must_use]
    pub fn with_default_horizon(mut self, days: u64) -> Self {
        self.default_horizon_days = days;
        self
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn identity(&self, region: &str) -> ModelIdentity {
        self.kind.identity(region)
    }

    /// End date used when a request omits one.
    pub fn default_end(&self, start: NaiveDate) -> NaiveDate {
        start.checked_add_days(Days::new(self.default_horizon_days)).unwrap_or(start)
    }

    /// Returns the cached model for `region`, restoring it from the store on a miss.
    ///
    /// # Errors
    ///
    /// `ForecastError::ModelUnavailable` if the region was never trained.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn resolve_model(&self, region: &str) -> Result<Arc<dyn ForecastModel>, ForecastError> {
        let identity = self.identity(region);
        if let Some(model) = self.cache.get(&identity) {
            return Ok(model);
        }

        debug!(model = %identity, "Cache miss, restoring from store");
        let store = Arc::clone(&self.store);
        let (kind, params, owned_region) = (self.kind, self.params, region.to_string());
        let restored = tokio::task::spawn_blocking(move || {
            let mut model = ModelFactory::create(kind, &owned_region, params);
            model.restore(store.as_ref()).map(|()| model)
        })
        .await?
        .map_err(|e| ForecastError::from_model(region, e))?;

        let model: Arc<dyn ForecastModel> = Arc::from(restored);
        if let Some(evicted) = self.cache.put(Arc::clone(&model)) {
            info!(model = %identity, evicted = %evicted, "Evicted least recently used model");
        }
        info!(model = %identity, last_true_date = ?model.last_true_date(), "Model restored");
        Ok(model)
    }

    /// Produces one point per day over `[start, end]`, observed days first and
    /// model output after the model's last true date.
    ///
    /// A missing `end` defaults to `start` plus the configured horizon. A range
    /// that is still reversed after defaulting yields an empty timeline.
    ///
    /// # Errors
    ///
    /// `ForecastError::ModelUnavailable` if the region was never trained, or
    /// the data source and model errors otherwise.
    #[instrument(skip(self))]
    pub async fn resolve_and_forecast(
        &self,
        region: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let end = end.unwrap_or_else(|| self.default_end(start));
        if start > end {
            return Ok(Vec::new());
        }

        let model = self.resolve_model(region).await?;
        let last_true = model.last_true_date().ok_or(ModelError::UnfittedModel)?;
        let boundary = end.min(last_true);

        let mut timeline = Vec::new();
        if start <= boundary {
            let truth = self
                .source
                .fetch_series(region, Some(DateRange::new(start, boundary)?))
                .await?;
            timeline.extend(truth.into_iter().map(ForecastPoint::observed));
        }

        if end > boundary {
            let first = start.max(DateRange::next_day(boundary));
            let forecast = model.predict(first, end)?;
            timeline.extend(forecast.into_iter().map(ForecastPoint::predicted));
        }

        debug!(points = timeline.len(), boundary = %boundary, "Forecast assembled");
        Ok(timeline)
    }

    /// Fetches the full history for `region`, fits and saves a fresh model.
    ///
    /// A cached instance of the region is replaced; an uncached region is left
    /// to be restored by its next request.
    ///
    /// # Errors
    ///
    /// Data source failures, fit failures and store failures.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn train_region(&self, region: &str) -> Result<TrainingSummary, ForecastError> {
        let series = self.source.fetch_series(region, None).await?;
        let observations = series.len();
        info!(region = %region, observations, "Training model");

        let store = Arc::clone(&self.store);
        let (kind, params, owned_region) = (self.kind, self.params, region.to_string());
        let fitted = tokio::task::spawn_blocking(move || {
            let mut model = ModelFactory::create(kind, &owned_region, params);
            model.fit(&series)?;
            model.save(store.as_ref())?;
            Ok::<_, ModelError>(model)
        })
        .await?
        .map_err(|e| ForecastError::from_model(region, e))?;

        let identity = fitted.identity().clone();
        let last_true_date = fitted.last_true_date().ok_or(ModelError::UnfittedModel)?;
        let replaced_cached = self.cache.replace_if_present(Arc::from(fitted));

        info!(model = %identity, last_true_date = %last_true_date, replaced_cached, "Model trained and saved");
        Ok(TrainingSummary { identity, last_true_date, observations, replaced_cached })
    }

    /// Identities currently held in the cache.
    pub fn cached_models(&self) -> BTreeSet<ModelIdentity> {
        self.cache.list_identities()
    }

    /// Drops `region`'s model from the cache; the persisted record is kept.
    ///
    /// # Errors
    ///
    /// `ForecastError::Cache` if the region is not cached.
    pub fn evict(&self, region: &str) -> Result<(), ForecastError> {
        let identity = self.identity(region);
        self.cache.remove(&identity)?;
        info!(model = %identity, "Model evicted on request");
        Ok(())
    }

    /// Every model with a readable persisted record, sorted by identity.
    ///
    /// Corrupt records and records deleted while listing are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Store failures while listing, or unexpected failures reading a record.
    pub async fn persisted_models(&self) -> Result<Vec<PersistedModelInfo>, ForecastError> {
        let store = Arc::clone(&self.store);
        let models = tokio::task::spawn_blocking(move || {
            let mut identities = store.list()?;
            identities.sort();

            let mut models = Vec::with_capacity(identities.len());
            for identity in identities {
                let record = match store.read(&identity) {
                    Ok(record) => record,
                    Err(e @ (ModelError::Storage(_) | ModelError::ModelNotFound(_))) => {
                        warn!(model = %identity, error = %e, "Skipping unreadable model record");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                models.push(PersistedModelInfo {
                    key: identity.key(),
                    identity,
                    last_true_date: record.last_true_date,
                    saved_at: record.saved_at,
                });
            }
            Ok::<_, ModelError>(models)
        })
        .await??;
        Ok(models)
    }

    /// Deletes `region`'s persisted record and drops it from the cache.
    ///
    /// # Errors
    ///
    /// `ForecastError::ModelUnavailable` if the region has no persisted record.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete_persisted(&self, region: &str) -> Result<(), ForecastError> {
        let identity = self.identity(region);
        let store = Arc::clone(&self.store);
        let target = identity.clone();
        tokio::task::spawn_blocking(move || store.delete(&target))
            .await?
            .map_err(|e| ForecastError::from_model(region, e))?;

        let was_cached = self.cache.remove(&identity).is_ok();
        info!(model = %identity, was_cached, "Persisted model removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StaticDataSource;
    use covcast_abstraction::SeriesPoint;
    use covcast_models::MockModel;
    use covcast_store::MemoryModelStore;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, m, d).unwrap()
    }

    /// 2021-12-20 ..= 2022-01-10, values 1..=22.
    fn history() -> Vec<SeriesPoint> {
        let values: Vec<f64> = (1..=22).map(f64::from).collect();
        StaticDataSource::daily(NaiveDate::from_ymd_opt(2021, 12, 20).unwrap(), &values)
    }

    fn service(capacity: usize) -> ForecastService {
        let source = StaticDataSource::new()
            .with_series("FRA", history())
            .with_series("59", history())
            .with_series("62", history());
        ForecastService::new(
            Arc::new(ModelCache::with_capacity(capacity).unwrap()),
            Arc::new(MemoryModelStore::new()),
            Arc::new(source),
            ModelKind::Mock,
            FitParams::default(),
        )
    }

    #[tokio::test]
    async fn test_forecast_splits_at_last_true_date() {
        let svc = service(3);
        let summary = svc.train_region("FRA").await.unwrap();
        assert_eq!(summary.last_true_date, date(1, 10));
        assert_eq!(summary.observations, 22);

        let timeline =
            svc.resolve_and_forecast("FRA", date(1, 5), Some(date(1, 15))).await.unwrap();

        assert_eq!(timeline.len(), 11);
        let dates: Vec<_> = timeline.iter().map(|p| p.date).collect();
        let expected: Vec<_> = DateRange::new(date(1, 5), date(1, 15)).unwrap().days().collect();
        assert_eq!(dates, expected);

        assert!(timeline[..6].iter().all(|p| !p.predicted));
        assert!(timeline[6..].iter().all(|p| p.predicted));
        assert_eq!(timeline[5].date, date(1, 10));
        assert_eq!(timeline[6].date, date(1, 11));
        assert!((timeline[0].value - 17.0).abs() < f64::EPSILON);
        assert!((timeline[10].value - 22.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_forecast_entirely_after_boundary() {
        let svc = service(3);
        svc.train_region("59").await.unwrap();

        let timeline =
            svc.resolve_and_forecast("59", date(1, 20), Some(date(1, 22))).await.unwrap();
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0].date, date(1, 20));
        assert!(timeline.iter().all(|p| p.predicted));
    }

    #[tokio::test]
    async fn test_forecast_entirely_observed() {
        let svc = service(3);
        svc.train_region("59").await.unwrap();

        let timeline = svc.resolve_and_forecast("59", date(1, 1), Some(date(1, 3))).await.unwrap();
        assert_eq!(timeline.len(), 3);
        assert!(timeline.iter().all(|p| !p.predicted));
    }

    #[tokio::test]
    async fn test_missing_end_uses_default_horizon() {
        let svc = service(3).with_default_horizon(5);
        svc.train_region("62").await.unwrap();

        let timeline = svc.resolve_and_forecast("62", date(1, 11), None).await.unwrap();
        assert_eq!(timeline.len(), 6);
        assert_eq!(timeline.last().unwrap().date, date(1, 16));
    }

    #[tokio::test]
    async fn test_reversed_range_yields_empty_timeline() {
        let svc = service(3);
        let timeline =
            svc.resolve_and_forecast("FRA", date(1, 10), Some(date(1, 9))).await.unwrap();
        assert!(timeline.is_empty());
    }

    #[tokio::test]
    async fn test_untrained_region_is_unavailable() {
        let svc = service(3);
        let result = svc.resolve_and_forecast("62", date(1, 5), Some(date(1, 6))).await;
        assert!(matches!(result, Err(ForecastError::ModelUnavailable(r)) if r == "62"));
        assert!(svc.cached_models().is_empty());
    }

    #[tokio::test]
    async fn test_cold_load_populates_cache_and_respects_capacity() {
        let svc = service(2);
        for region in ["FRA", "59", "62"] {
            svc.train_region(region).await.unwrap();
        }
        assert!(svc.cached_models().is_empty());

        for region in ["FRA", "59", "62"] {
            svc.resolve_model(region).await.unwrap();
        }

        let cached = svc.cached_models();
        assert_eq!(cached.len(), 2);
        assert!(!cached.contains(&svc.identity("FRA")));
    }

    #[tokio::test]
    async fn test_training_replaces_cached_instance() {
        let svc = service(3);
        svc.train_region("FRA").await.unwrap();
        let first = svc.resolve_model("FRA").await.unwrap();

        let summary = svc.train_region("FRA").await.unwrap();
        assert!(summary.replaced_cached);

        let second = svc.resolve_model("FRA").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_training_uncached_region_leaves_cache_alone() {
        let svc = service(2);
        for region in ["FRA", "59", "62"] {
            svc.train_region(region).await.unwrap();
        }
        svc.resolve_model("FRA").await.unwrap();
        svc.resolve_model("59").await.unwrap();

        let summary = svc.train_region("62").await.unwrap();
        assert!(!summary.replaced_cached);

        let expected: BTreeSet<_> = [svc.identity("FRA"), svc.identity("59")].into_iter().collect();
        assert_eq!(svc.cached_models(), expected);
        assert_eq!(svc.cache().stats().total_evictions, 0);
    }

    #[tokio::test]
    async fn test_model_restored_before_retraining_is_not_cached() {
        let svc = service(3);
        svc.train_region("FRA").await.unwrap();

        // Restored from the record that predates the training above.
        let mut outdated = MockModel::new("FRA");
        outdated.fit(&history()[..10]).unwrap();
        svc.cache().put(Arc::new(outdated));
        assert!(svc.cached_models().is_empty());

        let current = svc.resolve_model("FRA").await.unwrap();
        assert_eq!(current.last_true_date(), Some(date(1, 10)));
        assert_eq!(svc.cached_models().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_persisted_drops_record_and_cache_entry() {
        let svc = service(3);
        svc.train_region("59").await.unwrap();
        svc.resolve_model("59").await.unwrap();

        svc.delete_persisted("59").await.unwrap();
        assert!(svc.cached_models().is_empty());
        assert!(svc.persisted_models().await.unwrap().is_empty());
        assert!(matches!(
            svc.delete_persisted("59").await,
            Err(ForecastError::ModelUnavailable(r)) if r == "59"
        ));
        assert!(matches!(
            svc.resolve_model("59").await,
            Err(ForecastError::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_evict_and_persisted_listing() {
        let svc = service(3);
        svc.train_region("59").await.unwrap();
        svc.resolve_model("59").await.unwrap();

        svc.evict("59").unwrap();
        assert!(matches!(svc.evict("59"), Err(ForecastError::Cache(_))));

        let persisted = svc.persisted_models().await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].key, "MOCK_59");
        assert_eq!(persisted[0].last_true_date, date(1, 10));
    }

    #[tokio::test]
    async fn test_training_unknown_region_fails() {
        let svc = service(3);
        let result = svc.train_region("75").await;
        assert!(matches!(result, Err(ForecastError::DataSource(_))));
        assert!(matches!(
            svc.resolve_model("75").await,
            Err(ForecastError::ModelUnavailable(_))
        ));
    }
}
