//! Core TTL cache implementation

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use super::config::CacheConfig;
use super::stats::{CacheStats, MetricsCollector};
use crate::resilience::{Clock, SystemClock};

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
    expires_at: Instant,
}

/// Thread-safe TTL cache with optional oldest-first size bound
///
/// A disabled cache never stores anything and never records statistics.
pub struct TtlCache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V, C> fmt::Debug for TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.config)
            .field("size", &self.entries.read().len())
            .finish()
    }
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Create a cache with a custom clock (useful for testing)
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            metrics: MetricsCollector::default(),
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Return the live value for `key`
    ///
    /// An expired entry counts as a miss and is not removed here.
    pub fn lookup(&self, key: &K) -> Option<Arc<V>> {
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now();
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.metrics.record_hit();
                Some(Arc::clone(&entry.value))
            }
            _ => {
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Store `value` with the configured TTL
    pub fn store(&self, key: K, value: impl Into<Arc<V>>) {
        self.store_with_ttl(key, value, self.config.ttl);
    }

    /// Store `value`, replacing any previous entry for `key` wholesale
    ///
    /// Expired entries are purged first; if the cache is still full the
    /// oldest entry is evicted.
    pub fn store_with_ttl(&self, key: K, value: impl Into<Arc<V>>, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        let now = self.clock.now();
        let Some(expires_at) = now.checked_add(ttl) else {
            debug!(ttl_ms = ttl.as_millis() as u64, "cache_ttl_overflow_skipped");
            return;
        };

        let mut entries = self.entries.write();
        self.purge_locked(&mut entries, now);

        if let Some(max) = self.config.max_entries {
            while entries.len() >= max && !entries.contains_key(&key) {
                if !self.evict_oldest(&mut entries) {
                    break;
                }
            }
        }

        entries.insert(key, CacheEntry { value: value.into(), inserted_at: now, expires_at });
        self.metrics.record_insert();
    }

    /// Remove `key`, returning whether an entry was present
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        self.purge_locked(&mut entries, now)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Entries currently held, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len(), self.config.max_entries)
    }

    fn purge_locked(&self, entries: &mut HashMap<K, CacheEntry<V>>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            self.metrics.record_expirations(purged);
        }
        purged
    }

    fn evict_oldest(&self, entries: &mut HashMap<K, CacheEntry<V>>) -> bool {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                entries.remove(&key);
                self.metrics.record_eviction();
                true
            }
            None => false,
        }
    }
}
