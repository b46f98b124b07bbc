//! Wallet identity: addresses, signatures and the challenge/response handshake.
//!
//! # Flow
//!
//! ```text
//! POST /auth/challenge {address}
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │ issue(): fresh nonce │
//! └─────────┬────────────┘
//!           │  wallet signs challenge.message()
//!           ▼
//! POST /auth/verify {address, nonce, signature}
//!           │
//!    ┌──────┴───────┐
//!    │ consume nonce│──── consumed ──▶ NonceReused
//!    └──────┬───────┘──── unknown/old ──▶ NonceExpired
//!           │
//!     verify signature ── bad ──▶ InvalidSignature
//!           │
//!           ▼
//!   VerifiedIdentity ──▶ SessionStore::create
//! ```

mod address;
mod challenge;
mod signer;

pub use address::{WalletAddress, ADDRESS_LEN};
pub(crate) use challenge::expiry;
pub use challenge::{Challenge, IdentityVerifier, VerifiedIdentity, NONCE_LEN};
pub use signer::{
    derive_address, Ed25519WalletVerifier, SignatureVerifier, WalletKey, SIGNING_CONTEXT,
};
