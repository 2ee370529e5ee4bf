//! Short-lived cache of health collector readings.
//!
//! The router consults the [`HealthCollector`](crate::HealthCollector)
//! for every explicit resolution and auto-selection candidate. Readings
//! are cached per model for a short TTL so a burst of requests costs one
//! collector query per model, not one per request.
//!
//! Moka-backed LRU + TTL.

use std::time::Duration;

use moka::sync::Cache;

/// Default maximum number of cached readings.
const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// Thread-safe store of recent per-model error rates.
///
/// `None` readings (collector has no data) are cached too, so a model
/// without data does not trigger a collector query on every request.
pub struct HealthCache {
    readings: Cache<String, Option<f64>>,
}

impl HealthCache {
    /// Create a cache whose readings expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        let readings = Cache::builder()
            .max_capacity(DEFAULT_MAX_ENTRIES)
            .time_to_live(ttl)
            .build();
        Self { readings }
    }

    /// Cached reading for a model. Outer `None` = not cached.
    pub fn get(&self, model: &str) -> Option<Option<f64>> {
        self.readings.get(model)
    }

    /// Record a reading.
    pub fn insert(&self, model: &str, error_rate: Option<f64>) {
        self.readings.insert(model.to_string(), error_rate);
    }

    /// Forget the reading for a model.
    pub fn invalidate(&self, model: &str) {
        self.readings.invalidate(model);
    }
}

impl std::fmt::Debug for HealthCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCache")
            .field("entries", &self.readings.entry_count())
            .finish()
    }
}
