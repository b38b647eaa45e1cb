//! ModelCache implementation with LRU eviction.

use chrono::NaiveDate;
use covcast_abstraction::{ForecastModel, ModelIdentity};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::config::{CacheConfig, CacheConfigError};
use super::types::{CacheStats, CachedModel};

/// Errors returned by cache mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The identity is not cached.
    #[error("Model not in cache: {0}")]
    NotFound(String),
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ModelIdentity, CachedModel>,
    /// Last issued access sequence number.
    clock: u64,
    /// Last true date of the most recent training per identity.
    trained: HashMap<ModelIdentity, NaiveDate>,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Find the least-recently-used identity.
    ///
    /// Sequence numbers are unique, the identity ordering only matters for
    /// equal sequences which cannot be produced by `tick`.
    fn find_lru_key(&self) -> Option<ModelIdentity> {
        self.entries
            .iter()
            .min_by(|(ka, a), (kb, b)| a.access_seq.cmp(&b.access_seq).then_with(|| ka.cmp(kb)))
            .map(|(key, _)| key.clone())
    }
}

/// Bounded cache of fitted models keyed by identity.
///
/// Every lookup and mutation runs under one mutex, so the capacity check,
/// the eviction and the insertion of `put` are a single atomic step. Models
/// are handed out as `Arc`s; slow work such as restoring a model happens
/// outside the cache and only the final `put` takes the lock.
pub struct ModelCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
}

impl ModelCache {
    /// Create a new model cache with the given configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if the configuration is invalid.
    pub fn new(config: CacheConfig) -> Result<Self, CacheConfigError> {
        config.validate()?;

        Ok(Self { state: Mutex::new(CacheState::default()), config })
    }

    /// Create a cache holding at most `max_capacity` models, other settings default.
    ///
    /// # Errors
    /// Returns `CacheConfigError::InvalidMaxCapacity` if `max_capacity` is 0.
    pub fn with_capacity(max_capacity: usize) -> Result<Self, CacheConfigError> {
        Self::new(CacheConfig::with_capacity(max_capacity))
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a model and refresh its recency on a hit.
    ///
    /// A miss is not an error: the caller restores or fits the model and then
    /// calls [`ModelCache::put`].
    pub fn get(&self, identity: &ModelIdentity) -> Option<Arc<dyn ForecastModel>> {
        let mut state = self.lock();
        let seq = state.tick();

        let model = state.entries.get_mut(identity).map(|cached| {
            cached.touch(seq);
            Arc::clone(&cached.model)
        });

        if model.is_some() {
            state.stats.total_hits += 1;
            debug!(model = %identity, "Cache hit");
        } else {
            state.stats.total_misses += 1;
            debug!(model = %identity, "Cache miss");
        }
        model
    }

    /// Insert or replace the entry for the model's identity.
    ///
    /// Inserting a new identity into a full cache first evicts the
    /// least-recently-used entry, whose identity is returned. Replacing an
    /// existing identity never evicts.
    ///
    /// A model whose last true date is older than the latest training
    /// recorded by [`ModelCache::replace_if_present`] is not cached.
    pub fn put(&self, model: Arc<dyn ForecastModel>) -> Option<ModelIdentity> {
        let identity = model.identity().clone();
        let mut state = self.lock();

        if let Some(&latest) = state.trained.get(&identity) {
            if model.last_true_date().is_none_or(|date| date < latest) {
                info!(
                    model = %identity,
                    latest_trained = %latest,
                    "Not caching model older than its latest training"
                );
                return None;
            }
        }

        let seq = state.tick();

        if let Some(cached) = state.entries.get_mut(&identity) {
            cached.model = model;
            cached.touch(seq);
            debug!(model = %identity, "Replaced cached model");
            return None;
        }

        let mut evicted = None;
        if state.entries.len() >= self.config.max_capacity {
            if let Some(lru_key) = state.find_lru_key() {
                state.entries.remove(&lru_key);
                state.stats.total_evictions += 1;
                info!(model = %lru_key, "Evicted LRU model from cache");
                evicted = Some(lru_key);
            }
        }

        state.entries.insert(identity.clone(), CachedModel::new(model, seq));
        state.stats.cache_size = state.entries.len();
        info!(model = %identity, cache_size = state.entries.len(), "Model cached");

        evicted
    }

    /// Swap in a freshly trained model if its identity is already cached.
    ///
    /// Returns whether an entry was replaced. An uncached identity is not
    /// inserted, so nothing is evicted, and the entry's recency is kept.
    /// The model's last true date becomes the floor for later `put`s of the
    /// same identity.
    pub fn replace_if_present(&self, model: Arc<dyn ForecastModel>) -> bool {
        let identity = model.identity().clone();
        let mut state = self.lock();

        if let Some(date) = model.last_true_date() {
            state.trained.insert(identity.clone(), date);
        }

        match state.entries.get_mut(&identity) {
            Some(cached) => {
                cached.model = model;
                debug!(model = %identity, "Replaced cached model with a retrained one");
                true
            }
            None => false,
        }
    }

    /// Remove a specific model from the cache.
    ///
    /// # Errors
    /// Returns `CacheError::NotFound` if the identity is not cached; the
    /// cache is left unchanged.
    pub fn remove(&self, identity: &ModelIdentity) -> Result<(), CacheError> {
        let mut state = self.lock();
        if state.entries.remove(identity).is_none() {
            return Err(CacheError::NotFound(identity.key()));
        }
        state.stats.cache_size = state.entries.len();
        info!(model = %identity, "Removed model from cache");
        Ok(())
    }

    /// Current cache membership.
    pub fn list_identities(&self) -> BTreeSet<ModelIdentity> {
        self.lock().entries.keys().cloned().collect()
    }

    /// Whether the identity is cached, without touching its recency.
    pub fn contains(&self, identity: &ModelIdentity) -> bool {
        self.lock().entries.contains_key(identity)
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no models.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of models held at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.max_capacity
    }

    /// Evict every entry idle for longer than the configured inactivity timeout.
    pub fn evict_inactive(&self) -> Vec<ModelIdentity> {
        self.evict_idle_longer_than(self.config.inactivity_timeout())
    }

    /// Evict every entry whose last access is older than `max_idle`.
    pub fn evict_idle_longer_than(&self, max_idle: Duration) -> Vec<ModelIdentity> {
        let mut state = self.lock();
        let expired: Vec<ModelIdentity> = state
            .entries
            .iter()
            .filter(|(_, cached)| cached.last_accessed.elapsed() > max_idle)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.entries.remove(key);
            state.stats.total_evictions += 1;
            info!(model = %key, "Evicted inactive model from cache");
        }
        state.stats.cache_size = state.entries.len();
        expired
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut result = state.stats.clone();
        result.cache_size = state.entries.len();
        result
    }

    /// Clear all models from the cache.
    pub fn clear(&self) {
        let mut state = self.lock();
        let cleared_count = state.entries.len();
        state.entries.clear();
        state.stats.cache_size = 0;
        info!(cleared_count, "Cleared all models from cache");
    }

    /// Get the cache configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("config", &self.config)
            .field("identities", &self.list_identities())
            .finish()
    }
}
