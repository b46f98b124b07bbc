//! Listings, pricing, availability and booking authorization.
//!
//! # Booking lifecycle
//!
//! ```text
//!  RECEIVED ──session/property/dates──▶ VALIDATED ──stake+price──▶ PRICED
//!     │                                    │                         │
//!     ▼                                    ▼                         ▼
//!  REJECTED                             REJECTED          AVAILABILITY_CHECKED
//!                                                                    │
//!                                                   conflict ◀───────┤
//!                                                                    ▼
//!                                                               COMMITTED
//!
//!  Confirmed ──cancel──▶ Cancelled
//!  Confirmed ──check_out──▶ CheckedOut   (host deposit released)
//! ```
//!
//! Availability check and commit happen under one per-property lock, so two
//! overlapping requests can never both commit.

mod availability;
mod guard;
mod pricing;
mod store;
mod types;

pub use availability::AvailabilityIndex;
pub use guard::{BookingAuthorizationGuard, BookingReceipt, BookingRejection, BookingStage};
pub use pricing::{PriceQuote, PricingEngine};
pub use store::{InMemoryPropertyStore, PropertyStore};
pub use types::{
    nights_between, ranges_overlap, BookingId, BookingRequest, BookingStatus, CommittedBooking,
    Money, NewProperty, Property, PropertyId, PropertyUpdate, MINOR_PER_MAJOR,
};
