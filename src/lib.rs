//! # stakestay
//!
//! Stake-gated authorization and booking economics for a wallet-authenticated
//! rental marketplace.
//!
//! This crate provides:
//! - Wallet challenge/response authentication with single-use nonces
//! - Sessions bound to a verified wallet address
//! - Host qualification and discount tiers read from a stake ledger
//! - Exact integer pricing of stays, fees and host deposits
//! - Overlap-free booking commits under concurrency
//!
//! ## Architecture
//!
//! [`BookingAuthorizationGuard`] composes the other components:
//! - Identity via [`IdentityVerifier`]
//! - Sessions via [`SessionStore`]
//! - Stake via [`StakeLedgerReader`] and [`HostQualificationEvaluator`]
//! - Prices via [`PricingEngine`]
//! - Dates via [`AvailabilityIndex`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use stakestay::{EngineBuilder, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut engine = EngineBuilder::new(config).build()?;
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod booking;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod identity;
pub mod session;
pub mod stake;

pub use booking::{
    AvailabilityIndex, BookingAuthorizationGuard, BookingReceipt, BookingRejection,
    BookingStage, Money, PricingEngine,
};
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
pub use event::{MarketEvent, MarketEventsChannel};
pub use identity::{IdentityVerifier, WalletAddress, WalletKey};
pub use session::{SessionId, SessionStore};
pub use stake::{HostQualificationEvaluator, StakeLedgerReader};
