//! Request cache implementation.

use crate::RequestCacheConfig;
use derive_getters::Getters;
use octoguard_error::CacheError;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Fixed per-entry bookkeeping cost added to the memory estimate.
const ENTRY_OVERHEAD_BYTES: usize = 64;

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    key: String,
    value: JsonValue,
    stored_at: Instant,
    ttl: Duration,
    #[getter(skip)]
    last_access: u64,
    #[getter(skip)]
    size: usize,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.stored_at.elapsed())
    }
}

/// Cache counters and occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Getters)]
pub struct CacheStats {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    size: usize,
    memory_estimate: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0.0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Access tick → key; the first entry is the least recently used.
    recency: BTreeMap<u64, String>,
    tick: u64,
    memory: usize,
    stats: CacheStats,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.last_access);
            entry.last_access = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.last_access);
        self.memory = self.memory.saturating_sub(entry.size);
        Some(entry)
    }

    fn evict_lru(&mut self) -> bool {
        let Some((_, key)) = self.recency.pop_first() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&key) {
            self.memory = self.memory.saturating_sub(entry.size);
        }
        self.stats.evictions += 1;
        tracing::debug!(key = %key, "Evicting LRU entry");
        true
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            memory_estimate: self.memory,
            ..self.stats
        }
    }
}

/// Bounded, time-expiring cache of successful read responses.
///
/// Entries expire lazily on lookup. When the entry count or the estimated
/// memory bound would be exceeded, the least recently used entry is evicted
/// first. Values are cloned on the way in and on the way out, so callers can
/// never mutate cached state.
///
/// All methods take `&self`; the cache synchronizes internally.
///
/// # Example
///
/// ```
/// use octoguard_cache::{RequestCache, RequestCacheConfig, cache_key};
/// use serde_json::json;
///
/// let cache = RequestCache::new(RequestCacheConfig::default());
/// let key = cache_key("GET", "/repos/x/y", None);
///
/// cache.set(&key, &json!({"id": 1}));
/// assert_eq!(cache.get(&key), Some(json!({"id": 1})));
/// ```
#[derive(Debug)]
pub struct RequestCache {
    config: RequestCacheConfig,
    state: Mutex<CacheState>,
}

impl RequestCache {
    /// Create a new request cache with configuration.
    pub fn new(config: RequestCacheConfig) -> Self {
        tracing::debug!(
            ttl_secs = config.ttl_secs(),
            max_size = config.max_size(),
            max_memory_bytes = ?config.max_memory_bytes(),
            enabled = config.enabled(),
            "Creating new RequestCache"
        );
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &RequestCacheConfig {
        &self.config
    }

    /// Get a cached value.
    ///
    /// Returns None if:
    /// - Entry doesn't exist
    /// - Entry is expired (it is removed)
    /// - Cache is disabled
    ///
    /// A hit marks the entry as most recently used.
    #[tracing::instrument(skip(self))]
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        if !self.config.enabled() {
            return None;
        }

        let mut state = self.state.lock();
        let expired = match state.entries.get(key) {
            None => {
                state.stats.misses += 1;
                tracing::debug!("Cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            tracing::debug!("Cache entry expired, removing");
            state.remove(key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            return None;
        }

        state.touch(key);
        state.stats.hits += 1;
        let entry = state.entries.get(key)?;
        tracing::debug!(time_remaining = ?entry.time_remaining(), "Cache hit");
        Some(entry.value.clone())
    }

    /// Insert a value with the default TTL.
    pub fn set(&self, key: &str, value: &JsonValue) {
        self.set_with_ttl(key, value, self.config.ttl());
    }

    /// Insert a value with an explicit TTL.
    ///
    /// Evicts least recently used entries until the new entry fits both the
    /// count and the memory bound. A value larger than the whole memory bound
    /// is not cached.
    #[tracing::instrument(skip(self, value), fields(ttl = ?ttl))]
    pub fn set_with_ttl(&self, key: &str, value: &JsonValue, ttl: Duration) {
        if !self.config.enabled() || *self.config.max_size() == 0 {
            tracing::debug!("Cache disabled, skipping insert");
            return;
        }

        let size = estimate_size(key, value);
        if let Some(max_memory) = *self.config.max_memory_bytes() {
            if size > max_memory {
                tracing::debug!(size, max_memory, "Value exceeds memory bound, not caching");
                return;
            }
        }

        let mut state = self.state.lock();
        state.remove(key);

        while state.entries.len() >= *self.config.max_size() && state.evict_lru() {}
        if let Some(max_memory) = *self.config.max_memory_bytes() {
            while state.memory + size > max_memory && state.evict_lru() {}
        }

        let tick = state.next_tick();
        state.recency.insert(tick, key.to_string());
        state.memory += size;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value: value.clone(),
                stored_at: Instant::now(),
                ttl,
                last_access: tick,
                size,
            },
        );

        tracing::debug!(size, cache_size = state.entries.len(), "Inserted entry into cache");
    }

    /// Remove a single entry. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key).is_some()
    }

    /// Live entries whose key matches `pattern`.
    ///
    /// Read-only: recency order and hit counters are untouched.
    pub fn find(&self, pattern: &str) -> Result<Vec<(String, JsonValue)>, CacheError> {
        let regex = compile(pattern)?;
        let state = self.state.lock();
        let mut matches: Vec<_> = state
            .entries
            .values()
            .filter(|entry| !entry.is_expired() && regex.is_match(&entry.key))
            .map(|entry| (entry.last_access, entry.key.clone(), entry.value.clone()))
            .collect();
        matches.sort_by_key(|(tick, _, _)| *tick);
        Ok(matches.into_iter().map(|(_, k, v)| (k, v)).collect())
    }

    /// Remove every entry whose key matches `pattern`. Returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub fn invalidate(&self, pattern: &str) -> Result<usize, CacheError> {
        let regex = compile(pattern)?;
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();
        for key in &doomed {
            state.remove(key);
        }
        tracing::debug!(removed = doomed.len(), "Invalidated cache entries");
        Ok(doomed.len())
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .values()
            .filter(|entry| entry.is_expired())
            .map(|entry| entry.key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        state.stats.expirations += expired.len() as u64;

        if !expired.is_empty() {
            tracing::info!(
                removed = expired.len(),
                remaining = state.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        expired.len()
    }

    /// Clear all cache entries. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.recency.clear();
        state.memory = 0;
        tracing::info!(cleared = count, "Cleared cache");
    }

    /// Clear all entries and zero the counters.
    pub fn reset(&self) {
        *self.state.lock() = CacheState::default();
        tracing::info!("Reset cache");
    }

    /// Current counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().snapshot()
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(RequestCacheConfig::default())
    }
}

fn compile(pattern: &str) -> Result<Regex, CacheError> {
    Regex::new(pattern).map_err(|e| CacheError::new(format!("Invalid key pattern '{}': {}", pattern, e)))
}

fn estimate_size(key: &str, value: &JsonValue) -> usize {
    let body = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    key.len() + body + ENTRY_OVERHEAD_BYTES
}
