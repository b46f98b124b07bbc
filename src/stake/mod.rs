//! Stake reading and host qualification.
//!
//! # Architecture
//!
//! ```text
//! host action received
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Check stake cache   │  (TTL ≤ 30s)
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!  FRESH         MISS/STALE
//!    │             │
//!    │             ▼
//!    │      Query ledger (timeout)
//!    │             │
//!    │      ┌──────┴───────┐
//!    │      │              │
//!    │     OK         ERR/TIMEOUT
//!    │      │              │
//!    │   cache it          ▼
//!    │      │      LedgerUnavailable
//!    ▼      ▼
//! HostQualificationEvaluator
//! ```

mod cache;
mod ledger;
mod qualification;

pub use cache::{CacheStats, StakeCache};
pub use ledger::{HttpStakeLedger, InMemoryLedger, StakeLedger, StakePosition};
pub use qualification::{HostQualification, HostQualificationEvaluator, MAX_BPS};

use crate::config::LedgerConfig;
use crate::error::{DependencyError, Result};
use crate::identity::WalletAddress;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read-only access to stake positions with timeout and bounded caching.
pub struct StakeLedgerReader {
    ledger: Arc<dyn StakeLedger>,
    cache: Option<StakeCache>,
    timeout: Duration,
}

impl StakeLedgerReader {
    /// Create a reader. A zero `cache_ttl` disables caching.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn StakeLedger>,
        timeout: Duration,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        let cache = (!cache_ttl.is_zero())
            .then(|| StakeCache::with_capacity(cache_capacity, cache_ttl));

        info!(
            "Stake reader initialized (timeout={:?}, cache_ttl={:?})",
            timeout, cache_ttl
        );

        Self {
            ledger,
            cache,
            timeout,
        }
    }

    /// Create a reader from configuration.
    #[must_use]
    pub fn from_config(ledger: Arc<dyn StakeLedger>, config: &LedgerConfig) -> Self {
        Self::new(
            ledger,
            config.query_timeout(),
            config.cache_ttl(),
            config.cache_capacity,
        )
    }

    /// Read the stake position of `address`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerUnavailable` if the ledger errors or does not answer
    /// within the timeout. Never substitutes a default position.
    pub async fn read(&self, address: WalletAddress) -> Result<StakePosition> {
        if let Some(cache) = &self.cache {
            if let Some(position) = cache.get(&address) {
                debug!("Stake for {address} served from cache");
                return Ok(position);
            }
        }

        let position =
            match tokio::time::timeout(self.timeout, self.ledger.stake_position(address)).await {
                Ok(Ok(position)) => position,
                Ok(Err(e)) => {
                    warn!("Stake read for {address} failed: {e}");
                    return Err(e);
                }
                Err(_) => {
                    warn!("Stake read for {address} timed out after {:?}", self.timeout);
                    return Err(DependencyError::LedgerUnavailable(format!(
                        "stake read timed out after {:?}",
                        self.timeout
                    ))
                    .into());
                }
            };

        if let Some(cache) = &self.cache {
            cache.insert(position);
        }
        Ok(position)
    }

    /// Drop any cached position for `address`.
    pub fn invalidate(&self, address: &WalletAddress) {
        if let Some(cache) = &self.cache {
            cache.invalidate(address);
        }
    }

    /// Cache statistics, if caching is enabled.
    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(StakeCache::stats)
    }
}
