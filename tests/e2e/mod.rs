//! End-to-end tests for the stakestay engine.
//!
//! Each test builds a full engine over an in-memory ledger and drives it
//! through the same entry points a transport layer would use.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod concurrency;
mod harness;
mod scenarios;

pub use harness::{HarnessError, TestHarness};
