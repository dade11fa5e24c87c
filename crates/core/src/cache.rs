//! TTL response cache with LRU eviction and cumulative hit/miss counters.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::ranking::Method;

/// Full shape of a recommendation request plus the snapshot generation it was computed
/// against, so answers from a replaced generation can never be served.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub product_id: String,
    pub method: Method,
    pub count: usize,
    pub category_filter: bool,
    pub user_id: Option<String>,
    pub generation: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
    pub entries: usize,
}

struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

pub struct ResponseCache<K, V> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> ResponseCache<K, V> {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Looks up `key` as of `now`. Expired entries are evicted and count as a miss.
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.entries.lock();
        let fresh = entries.peek(key).map(|entry| now < entry.expires_at);

        match fresh {
            Some(true) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                entries.get(key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                entries.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    pub fn insert_at(&self, key: K, value: V, now: DateTime<Utc>) {
        let expires_at = now + self.ttl;
        self.entries.lock().put(key, CacheEntry { value, expires_at });
    }

    /// Drops every entry. Counters are cumulative and survive.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        let rate = hits as f64 / total_requests.max(1) as f64 * 100.0;

        CacheStats {
            hits,
            misses,
            total_requests,
            hit_rate_percent: (rate * 100.0).round() / 100.0,
            entries: self.len(),
        }
    }
}
