//! Core data types for model caching.

use covcast_abstraction::ForecastModel;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A cached model entry with metadata.
#[derive(Clone)]
pub struct CachedModel {
    /// The cached model instance.
    pub model: Arc<dyn ForecastModel>,
    /// Timestamp of last access.
    pub last_accessed: Instant,
    /// Position of the last access in the cache's access order.
    ///
    /// Strictly increasing per cache, so it orders entries even when two
    /// accesses share the same `Instant`.
    pub access_seq: u64,
}

impl CachedModel {
    /// Create a new cached model entry stamped with `seq`.
    pub fn new(model: Arc<dyn ForecastModel>, seq: u64) -> Self {
        Self { model, last_accessed: Instant::now(), access_seq: seq }
    }

    /// Record an access at position `seq`.
    pub fn touch(&mut self, seq: u64) {
        self.last_accessed = Instant::now();
        self.access_seq = seq;
    }
}

impl std::fmt::Debug for CachedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedModel")
            .field("model", &self.model.identity().key())
            .field("last_accessed", &self.last_accessed)
            .field("access_seq", &self.access_seq)
            .finish()
    }
}

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of cache hits.
    pub total_hits: u64,
    /// Total number of cache misses.
    pub total_misses: u64,
    /// Total number of evictions (capacity or inactivity).
    pub total_evictions: u64,
    /// Current number of models in cache.
    pub cache_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockModel;

    #[test]
    fn test_touch_moves_entry_forward() {
        let mut entry = CachedModel::new(Arc::new(MockModel::new("FRA")), 1);
        let first_access = entry.last_accessed;

        entry.touch(7);
        assert_eq!(entry.access_seq, 7);
        assert!(entry.last_accessed >= first_access);
        assert!(format!("{entry:?}").contains("MOCK_FRA"));
    }
}
