//! Engine assembly and lifecycle.

use crate::booking::{
    AvailabilityIndex, BookingAuthorizationGuard, InMemoryPropertyStore, PricingEngine,
    PropertyStore,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::event::{create_event_channel, MarketEvent, MarketEventsChannel, MarketEventsSender};
use crate::identity::{
    Challenge, Ed25519WalletVerifier, IdentityVerifier, SignatureVerifier, WalletAddress,
};
use crate::session::{SessionId, SessionStore, SESSION_SNAPSHOT_FILE};
use crate::stake::{
    HostQualificationEvaluator, HttpStakeLedger, InMemoryLedger, StakeLedger, StakeLedgerReader,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Builder for constructing an engine.
pub struct EngineBuilder {
    config: EngineConfig,
    ledger: Option<Arc<dyn StakeLedger>>,
    signer: Option<Arc<dyn SignatureVerifier>>,
    properties: Option<Arc<dyn PropertyStore>>,
}

impl EngineBuilder {
    /// Create a new engine builder with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ledger: None,
            signer: None,
            properties: None,
        }
    }

    /// Use `ledger` instead of the one selected by configuration.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<dyn StakeLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use a custom wallet signature scheme.
    #[must_use]
    pub fn with_signature_verifier(mut self, signer: Arc<dyn SignatureVerifier>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Use a custom property store.
    #[must_use]
    pub fn with_property_store(mut self, properties: Arc<dyn PropertyStore>) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the root directory
    /// cannot be created, or a session snapshot cannot be restored.
    pub fn build(self) -> Result<Engine> {
        let config = self.config;
        config.validate()?;
        info!("Building stakestay engine with config: {:?}", config);

        std::fs::create_dir_all(&config.root_dir)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events_tx, _) = create_event_channel();

        let signer = self
            .signer
            .unwrap_or_else(|| Arc::new(Ed25519WalletVerifier));
        let identity = Arc::new(IdentityVerifier::new(
            config.auth.domain.clone(),
            config.auth.nonce_ttl(),
            signer,
        ));

        let sessions = if config.auth.persist_sessions {
            let path = config.root_dir.join(SESSION_SNAPSHOT_FILE);
            SessionStore::open(path, config.auth.session_ttl(), &identity)?
        } else {
            SessionStore::new(config.auth.session_ttl())
        };
        let sessions = Arc::new(sessions);

        let ledger: Arc<dyn StakeLedger> = match (self.ledger, &config.ledger.endpoint) {
            (Some(ledger), _) => ledger,
            (None, Some(endpoint)) => Arc::new(HttpStakeLedger::new(
                endpoint,
                config.ledger.query_timeout(),
            )?),
            (None, None) => {
                warn!("No ledger endpoint configured, using in-memory ledger");
                Arc::new(InMemoryLedger::new())
            }
        };
        let stake = Arc::new(StakeLedgerReader::from_config(ledger, &config.ledger));

        let properties = self
            .properties
            .unwrap_or_else(|| Arc::new(InMemoryPropertyStore::new()));

        let guard = Arc::new(BookingAuthorizationGuard::new(
            Arc::clone(&sessions),
            properties,
            Arc::new(AvailabilityIndex::new(config.booking.max_booking_nights)),
            Arc::clone(&stake),
            HostQualificationEvaluator::from_config(&config.economics),
            PricingEngine::from_config(&config.economics),
            events_tx.clone(),
        ));

        Ok(Engine {
            config,
            identity,
            sessions,
            stake,
            guard,
            shutdown_tx,
            shutdown_rx,
            events_tx,
        })
    }
}

/// A running stakestay engine.
pub struct Engine {
    config: EngineConfig,
    identity: Arc<IdentityVerifier>,
    sessions: Arc<SessionStore>,
    stake: Arc<StakeLedgerReader>,
    guard: Arc<BookingAuthorizationGuard>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    events_tx: MarketEventsSender,
}

impl Engine {
    /// The engine's root directory.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Issue a login challenge for `address`.
    ///
    /// # Errors
    ///
    /// `MalformedAddress` if `address` does not parse.
    pub fn request_challenge(&self, address: &str) -> Result<Challenge> {
        let address = WalletAddress::parse(address)?;
        Ok(self.identity.issue(address))
    }

    /// Verify a signed challenge and open a session.
    ///
    /// # Errors
    ///
    /// `MalformedAddress`, or any authentication error from verification.
    pub fn verify_challenge(
        &self,
        address: &str,
        nonce: &str,
        signature: &str,
    ) -> Result<SessionId> {
        let address = WalletAddress::parse(address)?;
        let proof = self.identity.verify(&address, nonce, signature)?;
        let session = self.sessions.create(proof);
        let _ = self.events_tx.send(MarketEvent::SessionCreated { address });
        Ok(session)
    }

    /// End a session. Returns whether it existed.
    pub fn disconnect(&self, session: &SessionId) -> bool {
        let address = self.sessions.resolve(session).ok();
        let removed = self.sessions.destroy(session);
        if let Some(address) = address.filter(|_| removed) {
            let _ = self.events_tx.send(MarketEvent::SessionDestroyed { address });
        }
        removed
    }

    /// End every session of `address`.
    pub fn disconnect_all(&self, address: &WalletAddress) -> usize {
        let removed = self.sessions.destroy_all_for(address);
        if removed > 0 {
            info!("Destroyed {removed} sessions for {address}");
            let _ = self
                .events_tx
                .send(MarketEvent::SessionDestroyed { address: *address });
        }
        removed
    }

    /// The booking and listing guard.
    #[must_use]
    pub fn guard(&self) -> Arc<BookingAuthorizationGuard> {
        Arc::clone(&self.guard)
    }

    /// The session store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The identity verifier.
    #[must_use]
    pub fn identity(&self) -> &IdentityVerifier {
        &self.identity
    }

    /// The stake reader.
    #[must_use]
    pub fn stake_reader(&self) -> &StakeLedgerReader {
        &self.stake
    }

    /// Subscribe to engine events.
    #[must_use]
    pub fn subscribe_events(&self) -> MarketEventsChannel {
        self.events_tx.subscribe()
    }

    /// Prune expired nonces and sessions as of `now`.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> (usize, usize) {
        let nonces = self.identity.prune_expired_at(now);
        let sessions = self.sessions.sweep_expired_at(now);
        if nonces > 0 || sessions > 0 {
            debug!("Swept {nonces} nonces and {sessions} sessions");
        }
        let _ = self
            .events_tx
            .send(MarketEvent::SweepCompleted { nonces, sessions });
        (nonces, sessions)
    }

    /// Prune expired nonces and sessions.
    pub fn sweep(&self) -> (usize, usize) {
        self.sweep_at(Utc::now())
    }

    fn persist_sessions(&self) {
        if let Err(e) = self.sessions.persist() {
            warn!("Failed to persist sessions: {e}");
        }
    }

    /// Run the expiry sweeper until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine encounters a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting stakestay engine");
        let _ = self.events_tx.send(MarketEvent::Started);

        let period = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        let mut sweeper = tokio::time::interval(period);
        sweeper.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!("Engine running, waiting for shutdown signal");
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }
                _ = sweeper.tick() => {
                    self.sweep();
                    self.persist_sessions();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, initiating shutdown");
                    self.shutdown();
                    break;
                }
            }
        }

        let _ = self.events_tx.send(MarketEvent::ShuttingDown);
        self.persist_sessions();
        info!("Engine shutdown complete");
        Ok(())
    }

    /// Request the engine to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// A handle that can request shutdown from another task.
    #[must_use]
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }
}
