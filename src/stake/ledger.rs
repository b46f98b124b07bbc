//! Read-only adapters over the external token ledger.
//!
//! The ledger is a trusted, eventually-consistent oracle exposing
//! `balanceOf`, `stakedAmount` and `pendingRewards`. Nothing here issues a
//! state-changing call.

use crate::error::{DependencyError, Error, Result};
use crate::identity::WalletAddress;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Stake position of an address as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    /// The address.
    pub address: WalletAddress,
    /// Liquid token balance.
    pub wallet_balance: u128,
    /// Tokens locked as stake.
    pub staked_amount: u128,
    /// Accrued, unclaimed rewards.
    pub pending_rewards: u128,
}

impl StakePosition {
    /// A position with nothing staked and no balance.
    #[must_use]
    pub const fn empty(address: WalletAddress) -> Self {
        Self {
            address,
            wallet_balance: 0,
            staked_amount: 0,
            pending_rewards: 0,
        }
    }
}

/// Source of stake positions.
///
/// A failed read must surface as `DependencyError::LedgerUnavailable`, never
/// as a zero position.
pub trait StakeLedger: Send + Sync {
    /// Read the current stake position of `address`.
    fn stake_position(&self, address: WalletAddress) -> BoxFuture<'_, Result<StakePosition>>;
}

fn unavailable(reason: impl Into<String>) -> Error {
    DependencyError::LedgerUnavailable(reason.into()).into()
}

/// JSON body returned by each oracle view.
#[derive(Debug, Deserialize)]
struct LedgerValue {
    /// Decimal string; uint256 values do not fit JSON numbers.
    value: String,
}

impl LedgerValue {
    fn parse(&self, view: &str) -> Result<u128> {
        self.value
            .trim()
            .parse::<u128>()
            .map_err(|e| unavailable(format!("{view} returned non-integer {:?}: {e}", self.value)))
    }
}

/// Ledger oracle reached over HTTP.
///
/// Each view is a `GET {endpoint}/{view}/{address}` answering `{"value": "<uint>"}`.
pub struct HttpStakeLedger {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpStakeLedger {
    /// Create an HTTP ledger client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("ledger client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn view(&self, view: &'static str, address: WalletAddress) -> Result<u128> {
        let url = format!("{}/{view}/{address}", self.endpoint);
        debug!("Ledger query {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(format!("{view} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Ledger view {view} for {address} returned {status}");
            return Err(unavailable(format!("{view} returned HTTP {status}")));
        }

        let body: LedgerValue = response
            .json()
            .await
            .map_err(|e| unavailable(format!("{view} response malformed: {e}")))?;
        body.parse(view)
    }
}

impl StakeLedger for HttpStakeLedger {
    fn stake_position(&self, address: WalletAddress) -> BoxFuture<'_, Result<StakePosition>> {
        async move {
            let (wallet_balance, staked_amount, pending_rewards) = tokio::try_join!(
                self.view("balanceOf", address),
                self.view("stakedAmount", address),
                self.view("pendingRewards", address),
            )?;
            Ok(StakePosition {
                address,
                wallet_balance,
                staked_amount,
                pending_rewards,
            })
        }
        .boxed()
    }
}

/// Ledger held in memory, for development and tests.
///
/// Unknown addresses read as an empty position. The ledger can be switched
/// offline or given artificial latency to exercise failure paths.
#[derive(Default)]
pub struct InMemoryLedger {
    positions: RwLock<HashMap<WalletAddress, StakePosition>>,
    offline: AtomicBool,
    latency: RwLock<Option<Duration>>,
    reads: AtomicU64,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staked amount of `address`.
    pub fn set_stake(&self, address: WalletAddress, staked_amount: u128) {
        let mut positions = self.positions.write();
        let position = positions
            .entry(address)
            .or_insert_with(|| StakePosition::empty(address));
        position.staked_amount = staked_amount;
    }

    /// Replace the full position of an address.
    pub fn set_position(&self, position: StakePosition) {
        self.positions.write().insert(position.address, position);
    }

    /// Make every read fail with `LedgerUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every read.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Number of reads served (including failed ones).
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl StakeLedger for InMemoryLedger {
    fn stake_position(&self, address: WalletAddress) -> BoxFuture<'_, Result<StakePosition>> {
        async move {
            self.reads.fetch_add(1, Ordering::SeqCst);

            let latency = *self.latency.read();
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }

            if self.offline.load(Ordering::SeqCst) {
                return Err(unavailable("in-memory ledger offline"));
            }

            Ok(self
                .positions
                .read()
                .get(&address)
                .copied()
                .unwrap_or_else(|| StakePosition::empty(address)))
        }
        .boxed()
    }
}
