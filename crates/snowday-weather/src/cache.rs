//! TTL cache for fetched forecasts, persisted through a `KeyValueStore`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use snowday_core::StorageError;
use snowday_store::{JsonStoreExt, KeyValueStore};

use crate::types::HourlySamples;

pub const CACHE_KEY_PREFIX: &str = "snowday:forecast:";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// A fetched forecast day and when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub samples: HourlySamples,
    pub fetched_at_epoch_ms: i64,
    #[serde(default)]
    pub place_name: Option<String>,
}

impl CacheEntry {
    pub fn new(samples: HourlySamples, place_name: Option<String>) -> Self {
        Self {
            samples,
            fetched_at_epoch_ms: Utc::now().timestamp_millis(),
            place_name,
        }
    }

    /// Fresh while strictly younger than `ttl`.
    pub fn is_fresh_at(&self, now_epoch_ms: i64, ttl: Duration) -> bool {
        let age_ms = now_epoch_ms.saturating_sub(self.fetched_at_epoch_ms);
        i128::from(age_ms) < ttl.as_millis() as i128
    }
}

/// Build the cache key for one (location, school type, caution level) triple.
pub fn cache_key(location: &str, school_type: &str, caution_level: &str) -> String {
    format!(
        "{}{}:{}:{}",
        CACHE_KEY_PREFIX,
        location.trim().to_uppercase(),
        school_type,
        caution_level
    )
}

/// Forecast cache with logical expiry.
///
/// Expired entries stay in the store until a re-fetch overwrites them.
#[derive(Clone)]
pub struct ForecastCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ForecastCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any. Storage failures read as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Utc::now().timestamp_millis())
    }

    pub fn get_at(&self, key: &str, now_epoch_ms: i64) -> Option<CacheEntry> {
        let entry: CacheEntry = match self.store.get_json(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!("Forecast cache miss: {}", key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Forecast cache unreadable, treating as miss: {}", e);
                return None;
            }
        };

        if entry.is_fresh_at(now_epoch_ms, self.ttl) {
            tracing::debug!("Forecast cache hit: {}", key);
            Some(entry)
        } else {
            tracing::debug!("Forecast cache entry expired: {}", key);
            None
        }
    }

    /// Store `entry` under `key`, replacing anything there.
    ///
    /// # Errors
    /// Returns the storage failure; callers are expected to log and carry on.
    pub fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StorageError> {
        self.store.put_json(key, entry)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::{replicate, WeatherSample};
    use snowday_store::{MemoryStore, StoreResult};

    const MINUTE_MS: i64 = 60 * 1000;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn put(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
    }

    fn entry_at(fetched_at_epoch_ms: i64) -> CacheEntry {
        CacheEntry {
            samples: replicate(WeatherSample::new(1.0, -2.0, 50.0, 12.0)),
            fetched_at_epoch_ms,
            place_name: None,
        }
    }

    #[test]
    fn test_entry_59_minutes_old_is_hit() {
        let cache = ForecastCache::new(Arc::new(MemoryStore::new()));
        let now = 1_800_000_000_000;
        cache.put("k", &entry_at(now - 59 * MINUTE_MS)).unwrap();

        assert!(cache.get_at("k", now).is_some());
    }

    #[test]
    fn test_entry_61_minutes_old_is_miss() {
        let cache = ForecastCache::new(Arc::new(MemoryStore::new()));
        let now = 1_800_000_000_000;
        cache.put("k", &entry_at(now - 61 * MINUTE_MS)).unwrap();

        assert!(cache.get_at("k", now).is_none());
    }

    #[test]
    fn test_entry_exactly_ttl_old_is_miss() {
        let entry = entry_at(0);
        assert!(!entry.is_fresh_at(60 * MINUTE_MS, DEFAULT_CACHE_TTL));
        assert!(entry.is_fresh_at(60 * MINUTE_MS - 1, DEFAULT_CACHE_TTL));
    }

    #[test]
    fn test_round_trips_samples() {
        let cache = ForecastCache::new(Arc::new(MemoryStore::new()));
        let entry = CacheEntry::new(
            replicate(WeatherSample::new(3.0, -1.0, 90.0, 41.0)),
            Some("Burlington, VT".into()),
        );
        cache.put("k", &entry).unwrap();

        assert_eq!(cache.get("k"), Some(entry));
    }

    #[test]
    fn test_key_changes_with_each_component() {
        let base = cache_key("05401", "public", "standard");
        assert_ne!(base, cache_key("05402", "public", "standard"));
        assert_ne!(base, cache_key("05401", "private", "standard"));
        assert_ne!(base, cache_key("05401", "public", "cautious"));
        assert_eq!(base, cache_key(" 05401 ", "public", "standard"));
        assert!(base.starts_with(CACHE_KEY_PREFIX));
    }

    #[test]
    fn test_broken_store_reads_as_miss() {
        let cache = ForecastCache::new(Arc::new(BrokenStore));
        assert!(cache.get("k").is_none());
        assert!(cache.put("k", &entry_at(0)).is_err());
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let store = Arc::new(MemoryStore::new());
        store.put("k", "[1,2,3]").unwrap();
        let cache = ForecastCache::new(store);

        assert!(cache.get("k").is_none());
    }
}
