//! Cache statistics and metrics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries (expired ones included until purged)
    pub size: usize,

    /// Maximum allowed entries (None = unlimited)
    pub max_entries: Option<usize>,

    /// Lookups that returned a live entry
    pub hits: u64,

    /// Lookups that found nothing or an expired entry
    pub misses: u64,

    pub inserts: u64,

    /// Entries removed to make room
    pub evictions: u64,

    /// Expired entries removed
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Lock-free counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl MetricsCollector {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: usize) {
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize, max_entries: Option<usize>) -> CacheStats {
        CacheStats {
            size,
            max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `CacheStats::hit_rate` with and without accesses.
    ///
    /// Assertions:
    /// - Confirms an empty snapshot reports 0.0.
    /// - Confirms 3 hits and 1 miss report 0.75.
    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let collector = MetricsCollector::default();
        for _ in 0..3 {
            collector.record_hit();
        }
        collector.record_miss();
        let stats = collector.snapshot(1, Some(10));
        assert_eq!(stats.total_accesses(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
