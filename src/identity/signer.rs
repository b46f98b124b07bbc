//! Wallet signature verification.
//!
//! The identity layer only depends on the [`SignatureVerifier`] capability.
//! [`Ed25519WalletVerifier`] is the bundled implementation: a wallet address
//! is the last 20 bytes of `SHA-256(public_key)`, and a wallet signature is
//! the hex encoding of `public_key (32) || signature (64)`.

use crate::error::{Error, Result};
use crate::identity::address::{WalletAddress, ADDRESS_LEN};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Signing context for domain separation (prevents cross-protocol attacks).
pub const SIGNING_CONTEXT: &[u8] = b"stakestay-wallet-auth-v1";

/// Ed25519 public key size in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature size in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Encoded wallet signature size (public key followed by signature).
pub const WALLET_SIGNATURE_SIZE: usize = PUBLIC_KEY_SIZE + SIGNATURE_SIZE;

/// Capability that checks a wallet's signature over a message.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `true` iff `signature` is a valid signature by `address` over `message`.
    fn verify_signature(&self, address: &WalletAddress, message: &str, signature: &str) -> bool;
}

/// Derive the wallet address for an ed25519 public key.
#[must_use]
pub fn derive_address(public_key: &VerifyingKey) -> WalletAddress {
    let digest = Sha256::digest(public_key.as_bytes());
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
    WalletAddress::from_bytes(bytes)
}

fn context_bound(message: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(SIGNING_CONTEXT.len() + message.len());
    bytes.extend_from_slice(SIGNING_CONTEXT);
    bytes.extend_from_slice(message.as_bytes());
    bytes
}

/// Verifies ed25519 wallet signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519WalletVerifier;

impl Ed25519WalletVerifier {
    /// Verify a wallet signature, reporting why it was rejected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` for malformed encodings and
    /// `AuthenticationError::InvalidSignature` when the key does not belong
    /// to `address` or the signature does not verify.
    pub fn verify_detailed(address: &WalletAddress, message: &str, signature: &str) -> Result<()> {
        let raw = hex::decode(signature.trim_start_matches("0x"))
            .map_err(|e| Error::Serialization(format!("signature is not hex: {e}")))?;

        if raw.len() != WALLET_SIGNATURE_SIZE {
            return Err(Error::Serialization(format!(
                "Invalid signature size: expected {WALLET_SIGNATURE_SIZE}, got {}",
                raw.len()
            )));
        }

        let (key_bytes, sig_bytes) = raw.split_at(PUBLIC_KEY_SIZE);
        let key_bytes: [u8; PUBLIC_KEY_SIZE] = key_bytes
            .try_into()
            .map_err(|_| Error::Serialization("public key length".to_string()))?;
        let sig_bytes: [u8; SIGNATURE_SIZE] = sig_bytes
            .try_into()
            .map_err(|_| Error::Serialization("signature length".to_string()))?;

        let public_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| Error::Serialization(format!("invalid public key: {e}")))?;

        if derive_address(&public_key) != *address {
            debug!("Signature key does not belong to {address}");
            return Err(crate::error::AuthenticationError::InvalidSignature.into());
        }

        let sig = Signature::from_bytes(&sig_bytes);
        public_key
            .verify(&context_bound(message), &sig)
            .map_err(|_| crate::error::AuthenticationError::InvalidSignature.into())
    }
}

impl SignatureVerifier for Ed25519WalletVerifier {
    fn verify_signature(&self, address: &WalletAddress, message: &str, signature: &str) -> bool {
        match Self::verify_detailed(address, message, signature) {
            Ok(()) => true,
            Err(e) => {
                debug!("Wallet signature rejected for {address}: {e}");
                false
            }
        }
    }
}

/// An ed25519 wallet key able to sign challenge messages.
pub struct WalletKey {
    signing_key: SigningKey,
}

impl WalletKey {
    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Deterministic key from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Load a key whose 32-byte seed is stored hex-encoded in a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold 32 hex bytes.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut seed = [0u8; 32];
        hex::decode_to_slice(content.trim(), &mut seed)
            .map_err(|e| Error::Serialization(format!("invalid key file: {e}")))?;
        Ok(Self::from_seed(seed))
    }

    /// Hex-encoded secret seed.
    #[must_use]
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The wallet address controlled by this key.
    #[must_use]
    pub fn address(&self) -> WalletAddress {
        derive_address(&self.signing_key.verifying_key())
    }

    /// Sign a message, producing the encoded wallet signature.
    #[must_use]
    pub fn sign(&self, message: &str) -> String {
        let sig = self.signing_key.sign(&context_bound(message));
        let mut out = Vec::with_capacity(WALLET_SIGNATURE_SIZE);
        out.extend_from_slice(self.signing_key.verifying_key().as_bytes());
        out.extend_from_slice(&sig.to_bytes());
        hex::encode(out)
    }
}
