//! Test harness that builds an engine over an in-memory stake ledger.
//!
//! The `TestHarness` owns a temporary root directory, the engine and the
//! ledger backing it, and offers helpers for the login handshake and listing
//! setup.

use chrono::{Duration, NaiveDate, Utc};
use stakestay::booking::{Money, NewProperty, Property};
use stakestay::config::EngineConfig;
use stakestay::stake::{InMemoryLedger, StakeLedger};
use stakestay::{Engine, EngineBuilder, SessionId, WalletKey};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

/// Error type for test harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] stakestay::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Test harness that manages an engine and its ledger.
pub struct TestHarness {
    engine: Engine,
    ledger: Arc<InMemoryLedger>,
    _root: TempDir,
}

impl TestHarness {
    /// Create an engine with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to build.
    pub fn setup() -> Result<Self> {
        Self::setup_with(|_| {})
    }

    /// Create an engine after adjusting the default configuration.
    ///
    /// Stake caching is disabled unless `adjust` turns it back on, so ledger
    /// changes are visible immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to build.
    pub fn setup_with(adjust: impl FnOnce(&mut EngineConfig)) -> Result<Self> {
        let root = TempDir::new()?;
        let mut config = EngineConfig {
            root_dir: root.path().to_path_buf(),
            ..EngineConfig::default()
        };
        config.ledger.cache_ttl_secs = 0;
        adjust(&mut config);

        let ledger = Arc::new(InMemoryLedger::new());
        let engine = EngineBuilder::new(config)
            .with_ledger(Arc::clone(&ledger) as Arc<dyn StakeLedger>)
            .build()?;
        info!("Test harness ready at {}", root.path().display());

        Ok(Self {
            engine,
            ledger,
            _root: root,
        })
    }

    /// The engine under test.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The ledger backing the engine.
    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    /// Deterministic wallet for `seed`.
    pub fn wallet(seed: u8) -> WalletKey {
        WalletKey::from_seed([seed; 32])
    }

    /// Run the full challenge/response handshake for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the handshake fails.
    pub fn login(&self, key: &WalletKey) -> Result<SessionId> {
        let address = key.address().to_string();
        let challenge = self.engine.request_challenge(&address)?;
        let signature = key.sign(&challenge.message());
        Ok(self
            .engine
            .verify_challenge(&address, &challenge.nonce, &signature)?)
    }

    /// Stake `amount` for `host`, log in and list a property at `price` per night.
    ///
    /// # Errors
    ///
    /// Returns an error if login or listing fails.
    pub async fn list_as_host(
        &self,
        host: &WalletKey,
        amount: u128,
        price: u64,
    ) -> Result<Property> {
        self.ledger.set_stake(host.address(), amount);
        let session = self.login(host)?;
        let listing = NewProperty {
            price_per_night: Money::from_major(price).map_err(stakestay::Error::from)?,
        };
        Ok(self.engine.guard().create_listing(&session, listing).await?)
    }

    /// A date `days` from today.
    pub fn date_in(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }
}
