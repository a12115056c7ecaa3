// ABOUTME: TTL-bounded in-memory cache of brand-lookup results keyed by brand and meal name
// ABOUTME: LRU-bounded with lazy expiry on read; entries are replaced, never mutated
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Result Cache
//!
//! Short-lived cache of prior brand-lookup results so that repeated analyses
//! of the same branded meal skip the secondary model call. Keys are
//! `brand + "_" + mealName`, case-sensitive and caller-normalized. An entry
//! is a hit only while younger than the TTL (7 days by default); expired
//! entries are dropped lazily on read, no background sweep.
//!
//! Access is serialized by a single mutex. Orchestrator instances run one
//! pipeline at a time and the request rate is low, so per-key locking would
//! buy nothing.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::models::AnalysisResult;

/// Fallback capacity when a zero capacity is configured
const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

/// A cached result with its write timestamp
#[derive(Debug, Clone)]
struct CacheEntry {
    result: AnalysisResult,
    stored_at: Instant,
}

/// TTL-bounded in-memory result cache
pub struct ResultCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache with the given entry lifetime and capacity
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Build the cache key for a brand and meal name
    ///
    /// Case-sensitive; callers normalize before keying.
    #[must_use]
    pub fn key(brand: &str, meal_name: &str) -> String {
        format!("{brand}_{meal_name}")
    }

    /// Look up a fresh entry, dropping it if it has expired
    pub async fn get(&self, key: &str) -> Option<AnalysisResult> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!(key, "Result cache hit");
                Some(entry.result.clone())
            }
            Some(_) => {
                debug!(key, "Result cache entry expired");
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a result, replacing any previous entry under the same key
    pub async fn put(&self, key: String, result: AnalysisResult) {
        let entry = CacheEntry {
            result,
            stored_at: Instant::now(),
        };
        self.entries.lock().await.push(key, entry);
    }

    /// Number of live-or-expired entries currently held
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_sensitive() {
        assert_eq!(ResultCache::key("McDonald's", "Big Mac"), "McDonald's_Big Mac");
        assert_ne!(
            ResultCache::key("mcdonald's", "Big Mac"),
            ResultCache::key("McDonald's", "Big Mac")
        );
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let cache = ResultCache::new(Duration::from_secs(60), 8);
        let mut first = AnalysisResult::unknown();
        first.confidence = 0.4;
        let mut second = AnalysisResult::unknown();
        second.confidence = 0.9;

        cache.put("k".into(), first).await;
        cache.put("k".into(), second).await;

        let got = cache.get("k").await.unwrap();
        assert!((got.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(cache.len().await, 1);
    }
}
