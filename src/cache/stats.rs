//! Cache Statistics Module
//!
//! Space accounting per backend and hit/miss/expiration/eviction counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Backend Usage ==
/// Space accounting for one backend.
///
/// Usage reflects what is physically stored, so entries that have expired but
/// have not yet been read or swept still count.
#[derive(Debug, Clone, Serialize)]
pub struct BackendUsage {
    /// Bytes currently occupied by serialized entries
    pub used: u64,
    /// The backend's configured capacity in bytes
    pub available: u64,
    /// Used capacity as a percentage, 0.0 when the capacity is zero
    pub percentage: f64,
}

impl BackendUsage {
    pub(crate) fn new(used: u64, available: u64) -> Self {
        let percentage = if available == 0 {
            0.0
        } else {
            used as f64 / available as f64 * 100.0
        };
        Self {
            used,
            available,
            percentage,
        }
    }
}

// == Storage Stats ==
/// Usage report covering all three backends.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    /// Structured persistent backend
    pub disk: BackendUsage,
    /// Flat persistent backend
    pub local: BackendUsage,
    /// Flat session backend
    pub session: BackendUsage,
}

// == Cache Stats ==
/// Point-in-time counter snapshot for one backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (absent, corrupted or expired)
    pub misses: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Number of entries removed by capacity enforcement
    pub evictions: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Metrics ==
/// Counter snapshots for all three backends.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    /// Structured persistent backend
    pub disk: CacheStats,
    /// Flat persistent backend
    pub local: CacheStats,
    /// Flat session backend
    pub session: CacheStats,
}

// == Counters ==
/// Live per-backend counters, shared behind the facade.
///
/// Counters are advisory, so relaxed ordering is enough; a snapshot taken
/// during concurrent traffic is internally consistent per counter, not
/// across counters.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: u64) {
        self.expirations.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let counters = Counters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        assert_eq!(counters.snapshot().hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = Counters::default();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_counter_snapshot() {
        let counters = Counters::default();
        counters.record_hit();
        counters.record_miss();
        counters.record_expirations(3);
        counters.record_evictions(2);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.expirations, 3);
        assert_eq!(snapshot.evictions, 2);
    }

    #[test]
    fn test_backend_usage_percentage() {
        let usage = BackendUsage::new(250, 1000);
        assert_eq!(usage.used, 250);
        assert_eq!(usage.available, 1000);
        assert_eq!(usage.percentage, 25.0);
    }

    #[test]
    fn test_backend_usage_zero_capacity() {
        let usage = BackendUsage::new(0, 0);
        assert_eq!(usage.percentage, 0.0);
    }
}
