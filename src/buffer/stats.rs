//! Page cache counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the page cache.
///
/// Relaxed ordering throughout: the counters are independent and only
/// read as a point-in-time [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    pages_read: AtomicU64,
    pages_written: AtomicU64,
}

impl CacheCounters {
    #[inline]
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn page_read(&self) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn page_written(&self) {
        self.pages_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of page cache activity for one index file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches served from a cached frame.
    pub hits: u64,
    /// Fetches that had to read the page file.
    pub misses: u64,
    /// Pages pushed out of the cache to make room.
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
}

impl CacheStats {
    /// Fraction of fetches served from the cache, 0.0 when nothing was fetched.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.1}% evictions={} read={} written={}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.pages_read,
            self.pages_written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let counters = CacheCounters::default();
        for _ in 0..3 {
            counters.hit();
        }
        counters.miss();

        let stats = counters.snapshot();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display() {
        let stats = CacheStats {
            hits: 1,
            misses: 1,
            evictions: 2,
            pages_read: 1,
            pages_written: 4,
        };
        assert_eq!(
            stats.to_string(),
            "hits=1 misses=1 hit_rate=50.0% evictions=2 read=1 written=4"
        );
    }
}
