//! Booking domain types.

use crate::error::ValidationError;
use crate::identity::WalletAddress;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Property identifier.
pub type PropertyId = u64;

/// Booking identifier.
pub type BookingId = u64;

/// Minor units per major unit (cents per unit).
pub const MINOR_PER_MAJOR: u64 = 100;

/// An amount of money in integer minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// From minor units.
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// From whole major units.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the value does not fit.
    pub fn from_major(major: u64) -> Result<Self, ValidationError> {
        major
            .checked_mul(MINOR_PER_MAJOR)
            .map(Self)
            .ok_or(ValidationError::AmountOverflow)
    }

    /// Minor units.
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / MINOR_PER_MAJOR, self.0 % MINOR_PER_MAJOR)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    /// Parse a decimal amount with at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPrice(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if trimmed.contains('.') && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let major: u64 = whole.parse().map_err(|_| invalid())?;
        let minor: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .map(Self)
            .ok_or(ValidationError::AmountOverflow)
    }
}

/// A listed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property id.
    pub id: PropertyId,
    /// Host that created the listing.
    pub owner: WalletAddress,
    /// Nightly price.
    pub price_per_night: Money,
    /// Whether the listing accepts bookings.
    pub is_active: bool,
}

/// Fields a host supplies when listing a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProperty {
    /// Nightly price.
    pub price_per_night: Money,
}

/// Owner-initiated change to a listing. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    /// New nightly price.
    pub price_per_night: Option<Money>,
    /// Activate or deactivate the listing.
    pub is_active: Option<bool>,
}

/// A guest's request to book a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Target property.
    pub property_id: PropertyId,
    /// First night.
    pub check_in: NaiveDate,
    /// Departure day (exclusive).
    pub check_out: NaiveDate,
    /// Guest address (from the session).
    pub guest: WalletAddress,
}

/// Lifecycle of a committed booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Awaiting confirmation.
    Pending,
    /// Confirmed; occupies its dates.
    Confirmed,
    /// Cancelled; dates released.
    Cancelled,
    /// Guest has checked out; deposit released.
    CheckedOut,
}

impl BookingStatus {
    /// Upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::CheckedOut => "CHECKED_OUT",
        }
    }

    /// Whether a booking in this status blocks its date range.
    #[must_use]
    pub const fn occupies_dates(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking that passed authorization and was written to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedBooking {
    /// Booking id.
    pub id: BookingId,
    /// Booked property.
    pub property_id: PropertyId,
    /// Guest address.
    pub guest: WalletAddress,
    /// First night.
    pub check_in: NaiveDate,
    /// Departure day (exclusive).
    pub check_out: NaiveDate,
    /// Amount charged to the guest.
    pub total_price: Money,
    /// Platform fee included in `total_price`.
    pub platform_fee: Money,
    /// Host deposit reserved until checkout.
    pub host_deposit: Money,
    /// Current status.
    pub status: BookingStatus,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl CommittedBooking {
    /// Whether `[check_in, check_out)` overlaps this booking's range.
    #[must_use]
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        ranges_overlap(self.check_in, self.check_out, check_in, check_out)
    }
}

/// Half-open interval overlap: `[a1, b1)` and `[a2, b2)` conflict iff `a1 < b2 && a2 < b1`.
#[must_use]
pub fn ranges_overlap(a1: NaiveDate, b1: NaiveDate, a2: NaiveDate, b2: NaiveDate) -> bool {
    a1 < b2 && a2 < b1
}

/// Number of nights between two dates (zero or negative spans yield 0).
#[must_use]
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
    u32::try_from((check_out - check_in).num_days()).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_money_parse_and_display() {
        assert_eq!("100".parse::<Money>().unwrap(), Money::from_minor(10_000));
        assert_eq!("100.5".parse::<Money>().unwrap(), Money::from_minor(10_050));
        assert_eq!("0.07".parse::<Money>().unwrap(), Money::from_minor(7));
        assert_eq!(Money::from_minor(10_050).to_string(), "100.50");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");

        for bad in ["", "-1", "1.234", "abc", "1.", ".5", "1e3"] {
            assert!(bad.parse::<Money>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_half_open_overlap() {
        // Back-to-back stays share a boundary day but do not overlap
        let overlap = |a: &str, b: &str, c: &str, e: &str| ranges_overlap(d(a), d(b), d(c), d(e));
        assert!(!overlap("2026-03-10", "2026-03-12", "2026-03-12", "2026-03-14"));
        assert!(overlap("2026-03-10", "2026-03-12", "2026-03-11", "2026-03-13"));
        assert!(overlap("2026-03-10", "2026-03-20", "2026-03-12", "2026-03-13"));
        assert!(!overlap("2026-03-14", "2026-03-16", "2026-03-10", "2026-03-12"));
    }

    #[test]
    fn test_nights_between() {
        assert_eq!(nights_between(d("2026-03-10"), d("2026-03-13")), 3);
        assert_eq!(nights_between(d("2026-03-10"), d("2026-03-10")), 0);
        assert_eq!(nights_between(d("2026-03-10"), d("2026-03-01")), 0);
    }

    #[test]
    fn test_only_confirmed_occupies() {
        assert!(BookingStatus::Confirmed.occupies_dates());
        assert!(!BookingStatus::Pending.occupies_dates());
        assert!(!BookingStatus::Cancelled.occupies_dates());
        assert!(!BookingStatus::CheckedOut.occupies_dates());
    }
}
