//! Availability index: committed date ranges per property.
//!
//! Each property has its own calendar behind its own mutex, so commits on
//! one property are serialized while different properties proceed in
//! parallel. The overlap check and the insert happen under the same lock,
//! making `commit` all-or-nothing.

use crate::booking::pricing::PriceQuote;
use crate::booking::types::{
    nights_between, BookingId, BookingRequest, BookingStatus, CommittedBooking, PropertyId,
};
use crate::error::{ConflictError, Result, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Calendar {
    bookings: Vec<CommittedBooking>,
}

impl Calendar {
    fn has_conflict(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.bookings
            .iter()
            .any(|b| b.status.occupies_dates() && b.overlaps(check_in, check_out))
    }

    fn get_mut(&mut self, id: BookingId) -> Option<&mut CommittedBooking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }
}

/// Tracks committed bookings and prevents double-booking.
pub struct AvailabilityIndex {
    calendars: RwLock<HashMap<PropertyId, Arc<Mutex<Calendar>>>>,
    locations: RwLock<HashMap<BookingId, PropertyId>>,
    next_id: AtomicU64,
    max_nights: u32,
}

impl AvailabilityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(max_nights: u32) -> Self {
        Self {
            calendars: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_nights,
        }
    }

    /// Check the date prerequisites for a stay, returning its night count.
    ///
    /// # Errors
    ///
    /// `CheckInInPast`, `CheckOutNotAfterCheckIn` or `StayTooLong`.
    pub fn validate_dates(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        today: NaiveDate,
    ) -> std::result::Result<u32, ValidationError> {
        if check_in < today {
            return Err(ValidationError::CheckInInPast);
        }
        if check_out <= check_in {
            return Err(ValidationError::CheckOutNotAfterCheckIn);
        }
        let nights = nights_between(check_in, check_out);
        if nights > self.max_nights {
            return Err(ValidationError::StayTooLong {
                nights,
                max: self.max_nights,
            });
        }
        Ok(nights)
    }

    fn calendar(&self, property_id: PropertyId) -> Option<Arc<Mutex<Calendar>>> {
        self.calendars.read().get(&property_id).cloned()
    }

    fn calendar_or_create(&self, property_id: PropertyId) -> Arc<Mutex<Calendar>> {
        if let Some(calendar) = self.calendar(property_id) {
            return calendar;
        }
        Arc::clone(self.calendars.write().entry(property_id).or_default())
    }

    /// Whether `[check_in, check_out)` is free on `property_id`.
    #[must_use]
    pub fn is_available(
        &self,
        property_id: PropertyId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> bool {
        self.calendar(property_id)
            .map_or(true, |c| !c.lock().has_conflict(check_in, check_out))
    }

    /// Atomically insert a confirmed booking if its range is free.
    ///
    /// # Errors
    ///
    /// Returns `DateConflict` if the range overlaps a confirmed booking.
    pub fn commit(&self, request: &BookingRequest, quote: &PriceQuote) -> Result<CommittedBooking> {
        self.commit_at(request, quote, Utc::now())
    }

    /// Atomically insert a confirmed booking as of `now`.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityIndex::commit`].
    pub fn commit_at(
        &self,
        request: &BookingRequest,
        quote: &PriceQuote,
        now: DateTime<Utc>,
    ) -> Result<CommittedBooking> {
        let calendar = self.calendar_or_create(request.property_id);
        let mut calendar = calendar.lock();

        if calendar.has_conflict(request.check_in, request.check_out) {
            debug!(
                "Date conflict on property {} for {}..{}",
                request.property_id, request.check_in, request.check_out
            );
            return Err(ConflictError::DateConflict.into());
        }

        let booking = CommittedBooking {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            property_id: request.property_id,
            guest: request.guest,
            check_in: request.check_in,
            check_out: request.check_out,
            total_price: quote.total,
            platform_fee: quote.platform_fee,
            host_deposit: quote.host_deposit,
            status: BookingStatus::Confirmed,
            created_at: now,
        };
        calendar.bookings.push(booking.clone());
        self.locations
            .write()
            .insert(booking.id, booking.property_id);
        drop(calendar);

        info!(
            "Committed booking {} on property {} ({}..{})",
            booking.id, booking.property_id, booking.check_in, booking.check_out
        );
        Ok(booking)
    }

    /// Look up a booking.
    #[must_use]
    pub fn get(&self, id: BookingId) -> Option<CommittedBooking> {
        let property_id = *self.locations.read().get(&id)?;
        let calendar = self.calendar(property_id)?;
        let booking = calendar.lock().bookings.iter().find(|b| b.id == id).cloned();
        booking
    }

    /// All bookings on a property, in commit order.
    #[must_use]
    pub fn bookings_for(&self, property_id: PropertyId) -> Vec<CommittedBooking> {
        self.calendar(property_id)
            .map(|c| c.lock().bookings.clone())
            .unwrap_or_default()
    }

    /// Cancel a booking, releasing its dates immediately.
    ///
    /// # Errors
    ///
    /// `BookingNotFound`, or `InvalidTransition` unless PENDING or CONFIRMED.
    pub fn cancel(&self, id: BookingId) -> Result<CommittedBooking> {
        self.transition(id, "cancel", BookingStatus::Cancelled, |s| {
            matches!(s, BookingStatus::Pending | BookingStatus::Confirmed)
        })
    }

    /// Mark a confirmed booking as checked out.
    ///
    /// # Errors
    ///
    /// `BookingNotFound`, or `InvalidTransition` unless CONFIRMED.
    pub fn check_out(&self, id: BookingId) -> Result<CommittedBooking> {
        self.transition(id, "check out", BookingStatus::CheckedOut, |s| {
            s == BookingStatus::Confirmed
        })
    }

    fn transition(
        &self,
        id: BookingId,
        action: &'static str,
        to: BookingStatus,
        allowed: impl Fn(BookingStatus) -> bool,
    ) -> Result<CommittedBooking> {
        let property_id = *self
            .locations
            .read()
            .get(&id)
            .ok_or(ValidationError::BookingNotFound(id))?;
        let calendar = self
            .calendar(property_id)
            .ok_or(ValidationError::BookingNotFound(id))?;
        let mut calendar = calendar.lock();
        let booking = calendar
            .get_mut(id)
            .ok_or(ValidationError::BookingNotFound(id))?;

        if !allowed(booking.status) {
            return Err(ValidationError::InvalidTransition {
                action,
                status: booking.status.as_str(),
            }
            .into());
        }

        booking.status = to;
        debug!("Booking {id} is now {to}");
        Ok(booking.clone())
    }
}
