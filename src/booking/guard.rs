//! Booking and listing authorization.
//!
//! A booking request walks
//! `RECEIVED → VALIDATED → PRICED → AVAILABILITY_CHECKED → COMMITTED`, and
//! can be rejected at any stage. The only write is the final atomic commit,
//! so a request dropped before it leaves no partial reservation.

use crate::booking::availability::AvailabilityIndex;
use crate::booking::pricing::{PriceQuote, PricingEngine};
use crate::booking::store::PropertyStore;
use crate::booking::types::{
    BookingId, BookingRequest, CommittedBooking, NewProperty, Property, PropertyId,
    PropertyUpdate,
};
use crate::error::{AuthorizationError, Error, Result, ValidationError};
use crate::event::{MarketEvent, MarketEventsSender};
use crate::identity::WalletAddress;
use crate::session::{SessionId, SessionStore};
use crate::stake::{HostQualification, HostQualificationEvaluator, StakeLedgerReader};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Stages of the booking state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStage {
    /// Request received; nothing checked yet.
    Received,
    /// Session, ownership and dates checked.
    Validated,
    /// Price computed.
    Priced,
    /// Availability confirmed (transient, inside the commit).
    AvailabilityChecked,
    /// Booking written.
    Committed,
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Received => "RECEIVED",
            Self::Validated => "VALIDATED",
            Self::Priced => "PRICED",
            Self::AvailabilityChecked => "AVAILABILITY_CHECKED",
            Self::Committed => "COMMITTED",
        })
    }
}

/// A rejected booking: the last stage reached and why it stopped.
#[derive(Debug, Error)]
#[error("booking rejected after {stage}: {error}")]
pub struct BookingRejection {
    /// Last stage the request reached.
    pub stage: BookingStage,
    /// Reason.
    #[source]
    pub error: Error,
}

impl BookingRejection {
    /// Machine-readable reason code.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.error.reason()
    }
}

impl From<BookingRejection> for Error {
    fn from(rejection: BookingRejection) -> Self {
        rejection.error
    }
}

/// An accepted booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReceipt {
    /// The committed booking.
    pub booking: CommittedBooking,
    /// Price breakdown.
    pub quote: PriceQuote,
    /// Host qualification used for the discount.
    pub host: HostQualification,
}

/// Composes sessions, stake, pricing and availability to approve writes.
pub struct BookingAuthorizationGuard {
    sessions: Arc<SessionStore>,
    properties: Arc<dyn PropertyStore>,
    availability: Arc<AvailabilityIndex>,
    stake: Arc<StakeLedgerReader>,
    evaluator: HostQualificationEvaluator,
    pricing: PricingEngine,
    events: MarketEventsSender,
}

impl BookingAuthorizationGuard {
    /// Create a guard over the given collaborators.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        properties: Arc<dyn PropertyStore>,
        availability: Arc<AvailabilityIndex>,
        stake: Arc<StakeLedgerReader>,
        evaluator: HostQualificationEvaluator,
        pricing: PricingEngine,
        events: MarketEventsSender,
    ) -> Self {
        Self {
            sessions,
            properties,
            availability,
            stake,
            evaluator,
            pricing,
            events,
        }
    }

    /// Authorize, price and commit a booking.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingRejection`] naming the last stage reached.
    pub async fn authorize_booking(
        &self,
        session: &SessionId,
        property_id: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> std::result::Result<BookingReceipt, BookingRejection> {
        self.authorize_booking_at(session, property_id, check_in, check_out, Utc::now())
            .await
    }

    /// Authorize a booking as of `now`.
    ///
    /// # Errors
    ///
    /// See [`BookingAuthorizationGuard::authorize_booking`].
    pub async fn authorize_booking_at(
        &self,
        session: &SessionId,
        property_id: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        now: DateTime<Utc>,
    ) -> std::result::Result<BookingReceipt, BookingRejection> {
        let reject = |stage: BookingStage, error: Error| self.reject(property_id, stage, error);

        // RECEIVED -> VALIDATED
        let guest = self
            .sessions
            .resolve_at(session, now)
            .map_err(|e| reject(BookingStage::Received, e))?;
        let property = self
            .bookable_property(property_id)
            .map_err(|e| reject(BookingStage::Received, e))?;
        if property.owner == guest {
            return Err(reject(
                BookingStage::Received,
                AuthorizationError::SelfBookingNotAllowed.into(),
            ));
        }
        self.availability
            .validate_dates(check_in, check_out, now.date_naive())
            .map_err(|e| reject(BookingStage::Received, e.into()))?;
        debug!("Booking on property {property_id} by {guest} validated");

        // VALIDATED -> PRICED
        let position = self
            .stake
            .read(property.owner)
            .await
            .map_err(|e| reject(BookingStage::Validated, e))?;
        // The listing may have been deleted or deactivated during the read.
        let property = self
            .bookable_property(property_id)
            .map_err(|e| reject(BookingStage::Validated, e))?;
        let host = self.evaluator.evaluate(&position);
        let discount_bps = if host.is_qualified_host {
            host.discount_bps
        } else {
            0
        };
        let quote = self
            .pricing
            .price(property.price_per_night, check_in, check_out, discount_bps)
            .map_err(|e| reject(BookingStage::Validated, e.into()))?;
        debug!(
            "Booking on property {property_id} priced at {} ({} bps discount)",
            quote.total, quote.discount_bps
        );

        // PRICED -> AVAILABILITY_CHECKED -> COMMITTED
        let request = BookingRequest {
            property_id,
            check_in,
            check_out,
            guest,
        };
        let booking = self
            .availability
            .commit_at(&request, &quote, now)
            .map_err(|e| reject(BookingStage::Priced, e))?;

        let _ = self.events.send(MarketEvent::BookingCommitted {
            booking_id: booking.id,
            property_id,
            guest,
        });

        Ok(BookingReceipt {
            booking,
            quote,
            host,
        })
    }

    fn reject(
        &self,
        property_id: PropertyId,
        stage: BookingStage,
        error: Error,
    ) -> BookingRejection {
        match &error {
            Error::Authentication(_) | Error::Authorization(_) => {
                warn!(
                    "Booking on property {property_id} rejected after {stage}: {}",
                    error.reason()
                );
            }
            _ => debug!(
                "Booking on property {property_id} rejected after {stage}: {}",
                error.reason()
            ),
        }
        let _ = self.events.send(MarketEvent::BookingRejected {
            property_id,
            reason: error.reason(),
        });
        BookingRejection { stage, error }
    }

    fn property(&self, property_id: PropertyId) -> Result<Property> {
        self.properties
            .get(property_id)?
            .ok_or_else(|| ValidationError::PropertyNotFound(property_id).into())
    }

    fn bookable_property(&self, property_id: PropertyId) -> Result<Property> {
        let property = self.property(property_id)?;
        if !property.is_active {
            return Err(ValidationError::PropertyInactive(property_id).into());
        }
        Ok(property)
    }

    /// Read and evaluate the stake of `address`.
    ///
    /// # Errors
    ///
    /// `LedgerUnavailable` if the ledger cannot be read.
    pub async fn qualification(&self, address: WalletAddress) -> Result<HostQualification> {
        let position = self.stake.read(address).await?;
        Ok(self.evaluator.evaluate(&position))
    }

    /// Host status of the session's address.
    ///
    /// # Errors
    ///
    /// Authentication errors, or `LedgerUnavailable`.
    pub async fn host_status(&self, session: &SessionId) -> Result<HostQualification> {
        let address = self.sessions.resolve(session)?;
        self.qualification(address).await
    }

    async fn require_qualified_host(&self, address: WalletAddress) -> Result<HostQualification> {
        let qualification = self.qualification(address).await?;
        if !qualification.is_qualified_host {
            warn!(
                "{address} is not a qualified host (threshold {})",
                self.evaluator.min_host_stake()
            );
            return Err(AuthorizationError::NotQualifiedHost.into());
        }
        Ok(qualification)
    }

    /// List a new property. The caller must be a qualified host.
    ///
    /// # Errors
    ///
    /// Authentication errors, `NotQualifiedHost`, `InvalidPrice`,
    /// `LedgerUnavailable` or `StoreUnavailable`.
    pub async fn create_listing(
        &self,
        session: &SessionId,
        listing: NewProperty,
    ) -> Result<Property> {
        let owner = self.sessions.resolve(session)?;
        if listing.price_per_night.is_zero() {
            return Err(ValidationError::InvalidPrice(listing.price_per_night.to_string()).into());
        }
        self.require_qualified_host(owner).await?;

        let property = self.properties.insert(owner, listing)?;
        info!("Listed property {} for {owner}", property.id);
        let _ = self.events.send(MarketEvent::ListingCreated {
            property_id: property.id,
            owner,
        });
        Ok(property)
    }

    /// Update a listing. Only the owner may do so; re-activating an inactive
    /// listing re-checks host qualification.
    ///
    /// # Errors
    ///
    /// Authentication errors, `PropertyNotFound`, `NotOwner`,
    /// `NotQualifiedHost`, `InvalidPrice`, `LedgerUnavailable` or `StoreUnavailable`.
    pub async fn update_property(
        &self,
        session: &SessionId,
        property_id: PropertyId,
        update: PropertyUpdate,
    ) -> Result<Property> {
        let caller = self.sessions.resolve(session)?;
        let current = self.property(property_id)?;
        if current.owner != caller {
            warn!("{caller} attempted to update property {property_id} they do not own");
            return Err(AuthorizationError::NotOwner.into());
        }
        if update.price_per_night.is_some_and(|p| p.is_zero()) {
            return Err(ValidationError::InvalidPrice("0.00".to_string()).into());
        }
        if update.is_active == Some(true) && !current.is_active {
            self.require_qualified_host(caller).await?;
        }

        let property = self
            .properties
            .update_if_owner(property_id, &caller, &update)?;
        let _ = self
            .events
            .send(MarketEvent::ListingUpdated { property_id });
        Ok(property)
    }

    /// Delete a listing. Only the owner may do so.
    ///
    /// # Errors
    ///
    /// Authentication errors, `PropertyNotFound`, `NotOwner` or `StoreUnavailable`.
    pub fn delete_property(
        &self,
        session: &SessionId,
        property_id: PropertyId,
    ) -> Result<Property> {
        let caller = self.sessions.resolve(session)?;
        let property = self.properties.delete_if_owner(property_id, &caller)?;
        info!("Deleted property {property_id}");
        let _ = self
            .events
            .send(MarketEvent::ListingDeleted { property_id });
        Ok(property)
    }

    fn booking_and_owner(
        &self,
        booking_id: BookingId,
    ) -> Result<(CommittedBooking, Option<WalletAddress>)> {
        let booking = self
            .availability
            .get(booking_id)
            .ok_or(ValidationError::BookingNotFound(booking_id))?;
        let owner = self.properties.get(booking.property_id)?.map(|p| p.owner);
        Ok((booking, owner))
    }

    /// Cancel a booking. The guest or the host may cancel.
    ///
    /// # Errors
    ///
    /// Authentication errors, `BookingNotFound`, `NotBookingParty` or
    /// `InvalidTransition`.
    pub fn cancel_booking(
        &self,
        session: &SessionId,
        booking_id: BookingId,
    ) -> Result<CommittedBooking> {
        let caller = self.sessions.resolve(session)?;
        let (booking, owner) = self.booking_and_owner(booking_id)?;
        if booking.guest != caller && owner != Some(caller) {
            return Err(AuthorizationError::NotBookingParty.into());
        }

        let cancelled = self.availability.cancel(booking_id)?;
        info!("Booking {booking_id} cancelled by {caller}");
        let _ = self
            .events
            .send(MarketEvent::BookingCancelled { booking_id });
        Ok(cancelled)
    }

    /// Check a booking out, releasing the host deposit. Host only.
    ///
    /// # Errors
    ///
    /// Authentication errors, `BookingNotFound`, `NotOwner` or `InvalidTransition`.
    pub fn check_out_booking(
        &self,
        session: &SessionId,
        booking_id: BookingId,
    ) -> Result<CommittedBooking> {
        let caller = self.sessions.resolve(session)?;
        let (_, owner) = self.booking_and_owner(booking_id)?;
        if owner != Some(caller) {
            return Err(AuthorizationError::NotOwner.into());
        }

        let done = self.availability.check_out(booking_id)?;
        info!(
            "Booking {booking_id} checked out, releasing deposit {}",
            done.host_deposit
        );
        let _ = self
            .events
            .send(MarketEvent::BookingCheckedOut { booking_id });
        Ok(done)
    }
}
