//! Booking price computation.
//!
//! All arithmetic is integer minor units; each basis-point product is rounded
//! half-up once, at the final unit.

use crate::booking::types::{nights_between, Money};
use crate::config::{DiscountSide, EconomicsConfig};
use crate::error::ValidationError;
use crate::stake::MAX_BPS;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Priced breakdown of a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Nights in `[check_in, check_out)`.
    pub nights: u32,
    /// Nightly price.
    pub price_per_night: Money,
    /// `price_per_night × nights`.
    pub subtotal: Money,
    /// Stake discount taken off the guest's subtotal.
    pub discount: Money,
    /// Platform fee on the discounted subtotal.
    pub platform_fee: Money,
    /// Deposit the host reserves until checkout.
    pub host_deposit: Money,
    /// Stake discount taken off the host deposit.
    pub deposit_discount: Money,
    /// Amount the guest pays: `subtotal − discount + platform_fee`.
    pub total: Money,
    /// Discount rate applied, in basis points.
    pub discount_bps: u32,
}

/// Computes booking totals, fees and deposits.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine {
    platform_fee_bps: u32,
    host_deposit_bps: u32,
    discount_side: DiscountSide,
}

/// `amount × bps / 10000`, rounded half-up.
fn apply_bps(amount: u64, bps: u32) -> Result<u64, ValidationError> {
    let scaled = u128::from(amount) * u128::from(bps) + u128::from(MAX_BPS / 2);
    u64::try_from(scaled / u128::from(MAX_BPS)).map_err(|_| ValidationError::AmountOverflow)
}

impl PricingEngine {
    /// Create a pricing engine.
    #[must_use]
    pub fn new(platform_fee_bps: u32, host_deposit_bps: u32, discount_side: DiscountSide) -> Self {
        Self {
            platform_fee_bps: platform_fee_bps.min(MAX_BPS),
            host_deposit_bps: host_deposit_bps.min(MAX_BPS),
            discount_side,
        }
    }

    /// Build from the economics configuration.
    #[must_use]
    pub fn from_config(config: &EconomicsConfig) -> Self {
        Self::new(
            config.platform_fee_bps,
            config.host_deposit_bps,
            config.discount_side,
        )
    }

    /// Price a stay.
    ///
    /// # Errors
    ///
    /// * `CheckOutNotAfterCheckIn` - empty or inverted range
    /// * `InvalidPrice` - zero nightly price
    /// * `AmountOverflow` - the subtotal does not fit
    pub fn price(
        &self,
        price_per_night: Money,
        check_in: NaiveDate,
        check_out: NaiveDate,
        discount_bps: u32,
    ) -> Result<PriceQuote, ValidationError> {
        if check_out <= check_in {
            return Err(ValidationError::CheckOutNotAfterCheckIn);
        }
        if price_per_night.is_zero() {
            return Err(ValidationError::InvalidPrice(price_per_night.to_string()));
        }

        let discount_bps = discount_bps.min(MAX_BPS);
        let nights = nights_between(check_in, check_out);
        let subtotal = price_per_night
            .minor()
            .checked_mul(u64::from(nights))
            .ok_or(ValidationError::AmountOverflow)?;

        let (discount, deposit_discount) = match self.discount_side {
            DiscountSide::Guest => (apply_bps(subtotal, discount_bps)?, 0),
            DiscountSide::HostDeposit => (0, apply_bps(subtotal, discount_bps)?),
        };

        let discounted = subtotal - discount;
        let platform_fee = apply_bps(discounted, self.platform_fee_bps)?;
        let host_deposit = apply_bps(subtotal - deposit_discount, self.host_deposit_bps)?;
        let total = discounted
            .checked_add(platform_fee)
            .ok_or(ValidationError::AmountOverflow)?;

        Ok(PriceQuote {
            nights,
            price_per_night,
            subtotal: Money::from_minor(subtotal),
            discount: Money::from_minor(discount),
            platform_fee: Money::from_minor(platform_fee),
            host_deposit: Money::from_minor(host_deposit),
            deposit_discount: Money::from_minor(deposit_discount),
            total: Money::from_minor(total),
            discount_bps,
        })
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::from_config(&EconomicsConfig::default())
    }
}
