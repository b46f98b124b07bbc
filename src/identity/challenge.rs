//! Challenge/response wallet authentication.
//!
//! A challenge binds a single-use nonce to an address and a domain. The
//! wallet signs [`Challenge::message`]; [`IdentityVerifier::verify`] consumes
//! the nonce and checks the signature.

use crate::error::{AuthenticationError, Result};
use crate::identity::address::WalletAddress;
use crate::identity::signer::SignatureVerifier;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Random nonce length in bytes.
pub const NONCE_LEN: usize = 16;

/// An issued authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Address the challenge was issued to.
    pub address: WalletAddress,
    /// Hex-encoded single-use nonce.
    pub nonce: String,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Domain the signature is bound to.
    pub domain: String,
}

impl Challenge {
    /// The exact text the wallet must sign.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "{} wants you to sign in with your wallet:\n{}\n\nNonce: {}\nIssued At: {}",
            self.domain,
            self.address,
            self.nonce,
            self.issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Proof that an address answered a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// The authenticated address.
    pub address: WalletAddress,
    /// The challenge that was answered.
    pub challenge: Challenge,
    /// The wallet signature over `challenge.message()`.
    pub signature: String,
    /// Verification time.
    pub verified_at: DateTime<Utc>,
}

/// `start + ttl`, saturating at the latest representable time.
pub(crate) fn expiry(start: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    start
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug)]
enum NonceState {
    Pending(Challenge),
    Consumed { expires_at: DateTime<Utc> },
}

impl NonceState {
    fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        match self {
            Self::Pending(challenge) => expiry(challenge.issued_at, ttl),
            Self::Consumed { expires_at } => *expires_at,
        }
    }
}

/// Issues nonces and verifies signed challenges.
pub struct IdentityVerifier {
    domain: String,
    nonce_ttl: Duration,
    signer: Arc<dyn SignatureVerifier>,
    nonces: Mutex<HashMap<String, NonceState>>,
}

impl IdentityVerifier {
    /// Create a verifier bound to `domain`.
    #[must_use]
    pub fn new(domain: String, nonce_ttl: Duration, signer: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            domain,
            nonce_ttl,
            signer,
            nonces: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh challenge for `address`.
    pub fn issue(&self, address: WalletAddress) -> Challenge {
        self.issue_at(address, Utc::now())
    }

    /// Issue a challenge as of `now`.
    pub fn issue_at(&self, address: WalletAddress, now: DateTime<Utc>) -> Challenge {
        let mut raw = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut raw);

        let challenge = Challenge {
            address,
            nonce: hex::encode(raw),
            issued_at: now,
            domain: self.domain.clone(),
        };

        self.nonces
            .lock()
            .insert(challenge.nonce.clone(), NonceState::Pending(challenge.clone()));

        debug!("Issued challenge nonce {} to {address}", challenge.nonce);
        challenge
    }

    /// Verify a signed challenge.
    ///
    /// # Errors
    ///
    /// * `NonceReused` - the nonce was already consumed
    /// * `NonceExpired` - the nonce is older than the TTL or was never issued
    /// * `InvalidSignature` - the nonce belongs to another address or the
    ///   signature does not verify
    pub fn verify(
        &self,
        address: &WalletAddress,
        nonce: &str,
        signature: &str,
    ) -> Result<VerifiedIdentity> {
        self.verify_at(address, nonce, signature, Utc::now())
    }

    /// Verify a signed challenge as of `now`.
    ///
    /// # Errors
    ///
    /// See [`IdentityVerifier::verify`].
    pub fn verify_at(
        &self,
        address: &WalletAddress,
        nonce: &str,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedIdentity> {
        let challenge = self.consume(nonce, now)?;

        if challenge.address != *address {
            warn!(
                "Nonce {nonce} was issued to {} but presented by {address}",
                challenge.address
            );
            return Err(AuthenticationError::InvalidSignature.into());
        }

        if !self
            .signer
            .verify_signature(address, &challenge.message(), signature)
        {
            warn!("Invalid signature from {address} for nonce {nonce}");
            return Err(AuthenticationError::InvalidSignature.into());
        }

        info!("Verified wallet identity {address}");
        Ok(VerifiedIdentity {
            address: *address,
            challenge,
            signature: signature.to_string(),
            verified_at: now,
        })
    }

    /// Re-check a previously verified identity (used when restoring sessions).
    #[must_use]
    pub fn reverify(&self, identity: &VerifiedIdentity) -> bool {
        identity.challenge.address == identity.address
            && identity.challenge.domain == self.domain
            && self.signer.verify_signature(
                &identity.address,
                &identity.challenge.message(),
                &identity.signature,
            )
    }

    /// Atomically move a pending nonce to consumed.
    fn consume(&self, nonce: &str, now: DateTime<Utc>) -> Result<Challenge> {
        let mut nonces = self.nonces.lock();

        let challenge = match nonces.get(nonce) {
            None => {
                debug!("Unknown nonce {nonce}");
                return Err(AuthenticationError::NonceExpired.into());
            }
            Some(NonceState::Consumed { .. }) => {
                warn!("Replay of consumed nonce {nonce}");
                return Err(AuthenticationError::NonceReused.into());
            }
            Some(NonceState::Pending(challenge)) => challenge.clone(),
        };

        let expires_at = expiry(challenge.issued_at, self.nonce_ttl);
        if now > expires_at {
            nonces.remove(nonce);
            debug!("Nonce {nonce} expired");
            return Err(AuthenticationError::NonceExpired.into());
        }

        nonces.insert(nonce.to_string(), NonceState::Consumed { expires_at });
        Ok(challenge)
    }

    /// Drop nonces (pending or consumed) past their TTL.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Utc::now())
    }

    /// Drop nonces past their TTL as of `now`.
    pub fn prune_expired_at(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.nonce_ttl;
        let mut nonces = self.nonces.lock();
        let before = nonces.len();
        nonces.retain(|_, state| state.expires_at(ttl) >= now);
        before - nonces.len()
    }

    /// Number of tracked nonces.
    #[must_use]
    pub fn tracked_nonces(&self) -> usize {
        self.nonces.lock().len()
    }

    /// Lifetime of an issued nonce.
    #[must_use]
    pub fn nonce_ttl(&self) -> Duration {
        self.nonce_ttl
    }

    /// Domain bound into challenges.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}
