//! In-process caching for computed trend series
//!
//! A bounded cache of topic series keyed by scope and date range, kept to
//! avoid recomputation across repeated queries. Entries remember the newest
//! batch id visible when they were built and are invalidated as soon as a
//! newer batch appears, so a cached result is never staler than the corpus
//! the caller sees. Cache consistency is the engine's internal
//! responsibility; no external synchronization is exposed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::models::{DateRange, TrendPoint};

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct CachedSeries {
    series: Vec<TrendPoint>,
    /// Newest batch id visible when this entry was built
    newest_batch_id: String,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CachedSeries>,
    /// Insertion order for bounded eviction
    order: VecDeque<String>,
    stats: CacheStats,
}

/// Bounded series cache
#[derive(Debug)]
pub struct SeriesCache {
    inner: Mutex<Inner>,
    max_entries: usize,
}

impl SeriesCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Deterministic key over everything that shapes a series
    pub fn cache_key(
        topic: &str,
        scope_label: &str,
        range: Option<DateRange>,
        platforms: Option<&[String]>,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(topic.as_bytes());
        hasher.update([0u8]);
        hasher.update(scope_label.as_bytes());
        hasher.update([0u8]);
        if let Some(range) = range {
            hasher.update(range.start.to_string().as_bytes());
            hasher.update(range.end.to_string().as_bytes());
        }
        hasher.update([0u8]);
        if let Some(platforms) = platforms {
            let mut sorted: Vec<&String> = platforms.iter().collect();
            sorted.sort();
            for platform in sorted {
                hasher.update(platform.as_bytes());
                hasher.update([1u8]);
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Fetch a series if present and still current for `newest_batch_id`
    pub fn get(&self, key: &str, newest_batch_id: Option<&str>) -> Option<Vec<TrendPoint>> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let fresh = match (inner.entries.get(key), newest_batch_id) {
            (Some(entry), Some(newest)) => entry.newest_batch_id == newest,
            (Some(_), None) => false,
            (None, _) => false,
        };

        if fresh {
            inner.stats.hits += 1;
            return inner.entries.get(key).map(|e| e.series.clone());
        }

        // Stale entries are removed eagerly so a new batch invalidates
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
        inner.stats.misses += 1;
        inner.stats.entries = inner.entries.len() as u64;
        None
    }

    /// Store a series computed against `newest_batch_id`
    pub fn put(&self, key: String, series: Vec<TrendPoint>, newest_batch_id: String) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !inner.entries.contains_key(&key) {
            while inner.entries.len() >= self.max_entries {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
                inner.stats.evictions += 1;
            }
            inner.order.push_back(key.clone());
        }

        inner.entries.insert(
            key,
            CachedSeries {
                series,
                newest_batch_id,
            },
        );
        inner.stats.entries = inner.entries.len() as u64;
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stats
    }
}

/// Optional cache wrapper for configurations that disable caching
#[derive(Debug)]
pub struct OptionalSeriesCache {
    inner: Option<SeriesCache>,
}

impl OptionalSeriesCache {
    pub fn enabled(max_entries: usize) -> Self {
        Self {
            inner: Some(SeriesCache::new(max_entries)),
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self, key: &str, newest_batch_id: Option<&str>) -> Option<Vec<TrendPoint>> {
        self.inner.as_ref()?.get(key, newest_batch_id)
    }

    pub fn put(&self, key: String, series: Vec<TrendPoint>, newest_batch_id: String) {
        if let Some(cache) = &self.inner {
            cache.put(key, series, newest_batch_id);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .as_ref()
            .map(SeriesCache::stats)
            .unwrap_or_default()
    }
}
