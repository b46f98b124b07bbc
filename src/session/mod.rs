//! Session store.
//!
//! Binds a verified wallet identity to an opaque session id. Sessions expire
//! after a fixed TTL or on explicit disconnect. Several live sessions per
//! address are allowed (multi-device).
//!
//! The store can snapshot itself to disk (MessagePack). Restoring a snapshot
//! re-verifies each session's signed challenge, so a tampered snapshot cannot
//! mint identities.

use crate::error::{AuthenticationError, Error, Result};
use crate::identity::{expiry, IdentityVerifier, VerifiedIdentity, WalletAddress};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the session snapshot inside the engine root directory.
pub const SESSION_SNAPSHOT_FILE: &str = "sessions.mp";

/// Opaque session identifier (32 random bytes, hex).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        Self(hex::encode(raw))
    }

    /// Wrap a session id presented by a client.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token string to hand to the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are bearer credentials; keep them out of debug logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "SessionId({prefix}…)")
    }
}

/// A live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session id.
    pub id: SessionId,
    /// Authenticated address.
    pub address: WalletAddress,
    /// Signed challenge that established the session.
    pub proof: VerifiedIdentity,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is expired as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Whether a restored session's lifetime is backed by its signed challenge.
///
/// Only `challenge.issued_at` is covered by the signature, so the proof must
/// have been accepted within the nonce window after it and the session may
/// not end later than one TTL after that.
fn proof_covers(session: &Session, ttl: Duration, nonce_ttl: Duration) -> bool {
    let proof = &session.proof;
    let issued_at = proof.challenge.issued_at;
    proof.verified_at >= issued_at
        && proof.verified_at <= expiry(issued_at, nonce_ttl)
        && session.expires_at <= expiry(proof.verified_at, ttl)
}

/// In-process session store with optional snapshot persistence.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, Session>>,
    snapshot_path: Option<PathBuf>,
}

impl SessionStore {
    /// Create an empty, non-persistent store.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    /// Open a persistent store at `path`, restoring any snapshot found there.
    ///
    /// Sessions that are expired, or whose proof no longer verifies, are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or decoded.
    pub fn open(path: PathBuf, ttl: Duration, verifier: &IdentityVerifier) -> Result<Self> {
        Self::open_at(path, ttl, verifier, Utc::now())
    }

    /// Open a persistent store as of `now`.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::open`].
    pub fn open_at(
        path: PathBuf,
        ttl: Duration,
        verifier: &IdentityVerifier,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut sessions = HashMap::new();

        if path.exists() {
            let bytes = std::fs::read(&path)?;
            let stored: Vec<Session> = rmp_serde::from_slice(&bytes)
                .map_err(|e| Error::Serialization(format!("session snapshot: {e}")))?;
            let total = stored.len();

            for session in stored {
                if session.is_expired_at(now) {
                    continue;
                }
                if session.proof.address != session.address || !verifier.reverify(&session.proof) {
                    warn!("Dropping session for {} with unverifiable proof", session.address);
                    continue;
                }
                if !proof_covers(&session, ttl, verifier.nonce_ttl()) {
                    warn!("Dropping session for {} outliving its proof", session.address);
                    continue;
                }
                sessions.insert(session.id.clone(), session);
            }

            info!(
                "Restored {} of {} sessions from {}",
                sessions.len(),
                total,
                path.display()
            );
        }

        Ok(Self {
            ttl,
            sessions: RwLock::new(sessions),
            snapshot_path: Some(path),
        })
    }

    /// Create a session for a verified identity.
    pub fn create(&self, identity: VerifiedIdentity) -> SessionId {
        self.create_at(identity, Utc::now())
    }

    /// Create a session as of `now`.
    pub fn create_at(&self, identity: VerifiedIdentity, now: DateTime<Utc>) -> SessionId {
        let id = SessionId::generate();
        let session = Session {
            id: id.clone(),
            address: identity.address,
            proof: identity,
            created_at: now,
            expires_at: expiry(now, self.ttl),
        };
        debug!("Created session {id:?} for {}", session.address);
        self.sessions.write().insert(id.clone(), session);
        id
    }

    /// Resolve a session to its address.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` for unknown ids, `SessionExpired` for expired sessions.
    pub fn resolve(&self, id: &SessionId) -> Result<WalletAddress> {
        self.resolve_at(id, Utc::now())
    }

    /// Resolve a session as of `now`.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::resolve`].
    pub fn resolve_at(&self, id: &SessionId, now: DateTime<Utc>) -> Result<WalletAddress> {
        {
            let sessions = self.sessions.read();
            match sessions.get(id) {
                None => return Err(AuthenticationError::SessionNotFound.into()),
                Some(session) if !session.is_expired_at(now) => return Ok(session.address),
                Some(_) => {}
            }
        }

        self.sessions.write().remove(id);
        debug!("Session {id:?} expired");
        Err(AuthenticationError::SessionExpired.into())
    }

    /// Destroy a session (disconnect). Returns whether it existed.
    pub fn destroy(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            debug!("Destroyed session {id:?}");
        }
        removed
    }

    /// Destroy every session of `address`. Returns how many were removed.
    pub fn destroy_all_for(&self, address: &WalletAddress) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.address != *address);
        before - sessions.len()
    }

    /// Remove expired sessions as of `now`.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }

    /// Remove expired sessions.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// Write the snapshot, if this store is persistent.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot: Vec<Session> = self.sessions.read().values().cloned().collect();
        let bytes = rmp_serde::to_vec_named(&snapshot)
            .map_err(|e| Error::Serialization(format!("session snapshot: {e}")))?;

        write_atomic(path, &bytes)?;
        debug!("Persisted {} sessions to {}", snapshot.len(), path.display());
        Ok(())
    }

    /// Number of stored sessions (including not-yet-swept expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Session TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
