//! Error types for stakestay.
//!
//! Every rejection carries a category and a stable machine-readable reason
//! code so the calling layer can render a specific message.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Wallet authentication or session failure.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    /// Authenticated, but not permitted to perform the action.
    #[error("not authorized: {0}")]
    Authorization(#[from] AuthorizationError),

    /// The requested dates collide with a confirmed booking.
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// An external collaborator could not answer.
    #[error("dependency unavailable: {0}")]
    Dependency(#[from] DependencyError),

    /// Malformed or out-of-range input.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failures of the challenge/response handshake and session lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// The signature does not verify for the claimed address.
    #[error("invalid signature")]
    InvalidSignature,
    /// The nonce is older than the challenge TTL or was never issued.
    #[error("nonce expired")]
    NonceExpired,
    /// The nonce has already been consumed.
    #[error("nonce already used")]
    NonceReused,
    /// The session outlived its TTL.
    #[error("session expired")]
    SessionExpired,
    /// No session with the presented id.
    #[error("session not found")]
    SessionNotFound,
}

/// Authenticated callers attempting something they may not do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// The caller does not own the property.
    #[error("caller is not the property owner")]
    NotOwner,
    /// A host tried to book their own listing.
    #[error("hosts may not book their own listing")]
    SelfBookingNotAllowed,
    /// The caller's stake is below the host threshold.
    #[error("stake below host qualification threshold")]
    NotQualifiedHost,
    /// The caller is neither the guest nor the host of a booking.
    #[error("caller is not a party to this booking")]
    NotBookingParty,
}

/// Reservation conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// The range overlaps a confirmed booking on the same property.
    #[error("requested dates overlap an existing booking")]
    DateConflict,
}

/// Transient failures of external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// The stake ledger could not be read (network, RPC or timeout).
    #[error("stake ledger unavailable: {0}")]
    LedgerUnavailable(String),
    /// The persistence store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Input that fails validation before any state is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Address is not a 20-byte hex value.
    #[error("malformed wallet address: {0}")]
    MalformedAddress(String),
    /// Check-in date lies before today.
    #[error("check-in date is in the past")]
    CheckInInPast,
    /// Check-out is not strictly after check-in.
    #[error("check-out must be after check-in")]
    CheckOutNotAfterCheckIn,
    /// Stay exceeds the configured maximum.
    #[error("stay of {nights} nights exceeds maximum of {max}")]
    StayTooLong {
        /// Requested nights.
        nights: u32,
        /// Configured maximum.
        max: u32,
    },
    /// Price is zero or unparsable.
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    /// Money arithmetic overflowed.
    #[error("amount overflow")]
    AmountOverflow,
    /// Unknown property id.
    #[error("property {0} not found")]
    PropertyNotFound(u64),
    /// Listing is not accepting bookings.
    #[error("property {0} is not active")]
    PropertyInactive(u64),
    /// Unknown booking id.
    #[error("booking {0} not found")]
    BookingNotFound(u64),
    /// Booking status does not allow the requested transition.
    #[error("cannot {action} a booking in status {status}")]
    InvalidTransition {
        /// Attempted action.
        action: &'static str,
        /// Current status.
        status: &'static str,
    },
}

impl Error {
    /// Stable machine-readable reason code.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Authentication(e) => match e {
                AuthenticationError::InvalidSignature => "INVALID_SIGNATURE",
                AuthenticationError::NonceExpired => "NONCE_EXPIRED",
                AuthenticationError::NonceReused => "NONCE_REUSED",
                AuthenticationError::SessionExpired => "SESSION_EXPIRED",
                AuthenticationError::SessionNotFound => "SESSION_NOT_FOUND",
            },
            Self::Authorization(e) => match e {
                AuthorizationError::NotOwner => "NOT_OWNER",
                AuthorizationError::SelfBookingNotAllowed => "SELF_BOOKING_NOT_ALLOWED",
                AuthorizationError::NotQualifiedHost => "NOT_QUALIFIED_HOST",
                AuthorizationError::NotBookingParty => "NOT_BOOKING_PARTY",
            },
            Self::Conflict(ConflictError::DateConflict) => "DATE_CONFLICT",
            Self::Dependency(e) => match e {
                DependencyError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
                DependencyError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            },
            Self::Validation(e) => match e {
                ValidationError::MalformedAddress(_) => "MALFORMED_ADDRESS",
                ValidationError::CheckInInPast => "CHECK_IN_IN_PAST",
                ValidationError::CheckOutNotAfterCheckIn => "CHECK_OUT_NOT_AFTER_CHECK_IN",
                ValidationError::StayTooLong { .. } => "STAY_TOO_LONG",
                ValidationError::InvalidPrice(_) => "INVALID_PRICE",
                ValidationError::AmountOverflow => "AMOUNT_OVERFLOW",
                ValidationError::PropertyNotFound(_) => "PROPERTY_NOT_FOUND",
                ValidationError::PropertyInactive(_) => "PROPERTY_INACTIVE",
                ValidationError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
                ValidationError::InvalidTransition { .. } => "INVALID_TRANSITION",
            },
            Self::Config(_) => "CONFIG",
            Self::Io(_) => "IO",
            Self::Serialization(_) => "SERIALIZATION",
        }
    }

    /// Whether the caller may retry (with backoff, or with a different range).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Dependency(_) | Self::Conflict(_))
    }

    /// HTTP status the API layer should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication(_) => 401,
            Self::Authorization(_) => 403,
            Self::Conflict(_) => 409,
            Self::Dependency(_) => 503,
            Self::Validation(
                ValidationError::PropertyNotFound(_) | ValidationError::BookingNotFound(_),
            ) => 404,
            Self::Validation(_) => 400,
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => 500,
        }
    }
}
