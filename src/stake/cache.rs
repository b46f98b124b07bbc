//! Bounded-TTL LRU cache for stake positions.
//!
//! Stake can change between reads, so an entry is only served while it is
//! younger than the configured TTL (never more than 30 seconds).

use crate::identity::WalletAddress;
use crate::stake::ledger::StakePosition;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default cache capacity.
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct CachedPosition {
    position: StakePosition,
    fetched_at: Instant,
}

/// LRU cache of recently read stake positions.
#[derive(Clone)]
pub struct StakeCache {
    inner: Arc<Mutex<LruCache<WalletAddress, CachedPosition>>>,
    stats: Arc<Mutex<CacheStats>>,
    ttl: Duration,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including stale entries).
    pub misses: u64,
    /// Number of entries added.
    pub additions: u64,
    /// Number of entries dropped for being older than the TTL.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl StakeCache {
    /// Create a cache with default capacity.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY, ttl)
    }

    /// Create a cache with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            stats: Arc::new(Mutex::new(CacheStats::default())),
            ttl,
        }
    }

    /// Fresh cached position for `address`, if any.
    pub fn get(&self, address: &WalletAddress) -> Option<StakePosition> {
        let now = Instant::now();
        let mut cache = self.inner.lock();

        let (found, expired) = match cache.get(address) {
            Some(entry) if now.duration_since(entry.fetched_at) < self.ttl => {
                (Some(entry.position), false)
            }
            Some(_) => (None, true),
            None => (None, false),
        };
        if expired {
            cache.pop(address);
        }
        drop(cache);

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        if expired {
            stats.expirations += 1;
        }

        found
    }

    /// Cache a position just read from the ledger.
    pub fn insert(&self, position: StakePosition) {
        let mut cache = self.inner.lock();
        cache.put(
            position.address,
            CachedPosition {
                position,
                fetched_at: Instant::now(),
            },
        );

        let mut stats = self.stats.lock();
        stats.additions += 1;
    }

    /// Drop the entry for `address`.
    pub fn invalidate(&self, address: &WalletAddress) {
        self.inner.lock().pop(address);
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Get the current number of entries in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
