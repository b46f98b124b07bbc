//! Host qualification and discount tiers.
//!
//! Pure functions of a [`StakePosition`]; this module never fetches data.

use crate::config::{DiscountTier, EconomicsConfig};
use crate::identity::WalletAddress;
use crate::stake::ledger::StakePosition;
use serde::{Deserialize, Serialize};

/// Full discount, in basis points.
pub const MAX_BPS: u32 = 10_000;

/// Outcome of evaluating a stake position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostQualification {
    /// The evaluated address.
    pub address: WalletAddress,
    /// Whether the address may act as a host.
    pub is_qualified_host: bool,
    /// Discount rate in basis points.
    pub discount_bps: u32,
    /// Rewards accrued on the ledger.
    pub rewards_due: u128,
}

/// Maps stake positions to host qualification and discount tier.
#[derive(Debug, Clone)]
pub struct HostQualificationEvaluator {
    min_host_stake: u128,
    tiers: Vec<DiscountTier>,
}

impl HostQualificationEvaluator {
    /// Create an evaluator. Tiers are sorted by `min_stake`.
    #[must_use]
    pub fn new(min_host_stake: u128, mut tiers: Vec<DiscountTier>) -> Self {
        tiers.sort_by_key(|t| t.min_stake);
        Self {
            min_host_stake,
            tiers,
        }
    }

    /// Build from the economics configuration.
    #[must_use]
    pub fn from_config(config: &EconomicsConfig) -> Self {
        Self::new(u128::from(config.min_host_stake), config.discount_tiers.clone())
    }

    /// Evaluate a position.
    #[must_use]
    pub fn evaluate(&self, position: &StakePosition) -> HostQualification {
        HostQualification {
            address: position.address,
            is_qualified_host: self.is_qualified(position.staked_amount),
            discount_bps: self.discount_rate(position.staked_amount),
            rewards_due: position.pending_rewards,
        }
    }

    /// Whether `staked_amount` meets the host threshold.
    #[must_use]
    pub fn is_qualified(&self, staked_amount: u128) -> bool {
        staked_amount >= self.min_host_stake
    }

    /// Discount for `staked_amount`: the highest tier whose minimum is met.
    ///
    /// An amount exactly on a boundary gets that boundary's (higher) tier.
    /// Non-decreasing in `staked_amount` even for misordered discount values,
    /// since the running maximum is taken.
    #[must_use]
    pub fn discount_rate(&self, staked_amount: u128) -> u32 {
        self.tiers
            .iter()
            .take_while(|t| u128::from(t.min_stake) <= staked_amount)
            .map(|t| t.discount_bps)
            .max()
            .unwrap_or(0)
            .min(MAX_BPS)
    }

    /// Host threshold.
    #[must_use]
    pub fn min_host_stake(&self) -> u128 {
        self.min_host_stake
    }
}

impl Default for HostQualificationEvaluator {
    fn default() -> Self {
        Self::from_config(&EconomicsConfig::default())
    }
}
