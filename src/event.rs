//! Engine event system.

use crate::booking::{BookingId, PropertyId};
use crate::identity::WalletAddress;
use tokio::sync::broadcast;

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    /// Engine has started.
    Started,

    /// Engine is shutting down.
    ShuttingDown,

    /// A wallet authenticated and received a session.
    SessionCreated {
        /// Authenticated address.
        address: WalletAddress,
    },

    /// A session was explicitly destroyed.
    SessionDestroyed {
        /// Address the session belonged to.
        address: WalletAddress,
    },

    /// A booking reached COMMITTED.
    BookingCommitted {
        /// Booking id.
        booking_id: BookingId,
        /// Property id.
        property_id: PropertyId,
        /// Guest address.
        guest: WalletAddress,
    },

    /// A booking request was rejected.
    BookingRejected {
        /// Property id.
        property_id: PropertyId,
        /// Machine-readable reason code.
        reason: &'static str,
    },

    /// A booking was cancelled.
    BookingCancelled {
        /// Booking id.
        booking_id: BookingId,
    },

    /// A booking was checked out and its deposit released.
    BookingCheckedOut {
        /// Booking id.
        booking_id: BookingId,
    },

    /// A qualified host listed a property.
    ListingCreated {
        /// Property id.
        property_id: PropertyId,
        /// Owner address.
        owner: WalletAddress,
    },

    /// A listing was updated by its owner.
    ListingUpdated {
        /// Property id.
        property_id: PropertyId,
    },

    /// A listing was deleted by its owner.
    ListingDeleted {
        /// Property id.
        property_id: PropertyId,
    },

    /// An expiry sweep finished.
    SweepCompleted {
        /// Nonces pruned.
        nonces: usize,
        /// Sessions pruned.
        sessions: usize,
    },
}

/// Channel for receiving engine events.
pub type MarketEventsChannel = broadcast::Receiver<MarketEvent>;

/// Sender for engine events.
pub type MarketEventsSender = broadcast::Sender<MarketEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (MarketEventsSender, MarketEventsChannel) {
    broadcast::channel(256)
}
