//! Short-lived caching of read-mostly backend responses
//!
//! The EDA report and model registry entries change only when the backend
//! retrains or reloads, so the dashboard serves them from memory for a
//! few minutes instead of re-fetching on every page view.

use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cached response documents keyed by backend path
pub struct ResponseCache {
    cache: Cache<String, serde_json::Value>,
    hits: AtomicU64,
    misses: AtomicU64,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_config(64, Duration::from_secs(300))
    }

    pub fn with_config(max_entries: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        match self.cache.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: &str, value: serde_json::Value) {
        self.cache.insert(key.to_string(), value);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}
