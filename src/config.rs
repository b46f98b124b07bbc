//! Configuration for stakestay.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Upper bound on how long a cached stake position may be trusted.
pub const MAX_STAKE_CACHE_TTL_SECS: u64 = 30;

/// Upper bound on `auth.nonce_ttl_secs` (one hour).
pub const MAX_NONCE_TTL_SECS: u64 = 3_600;

/// Upper bound on `auth.session_ttl_hours` (one year).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

/// Which party benefits from a qualified host's stake discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSide {
    /// The guest pays a reduced subtotal.
    #[default]
    Guest,
    /// The host reserves a smaller deposit.
    HostDeposit,
}

/// One step of the stake-to-discount function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    /// Minimum staked amount (inclusive) for this tier.
    pub min_stake: u64,
    /// Discount in basis points.
    pub discount_bps: u32,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory for engine data (session snapshots).
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Fee, deposit and stake-threshold configuration.
    #[serde(default)]
    pub economics: EconomicsConfig,

    /// Booking limits.
    #[serde(default)]
    pub booking: BookingConfig,

    /// Stake ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Interval between nonce/session expiry sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Challenge/response and session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Domain bound into every challenge message.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Lifetime of an issued nonce, in seconds.
    #[serde(default = "default_nonce_ttl")]
    pub nonce_ttl_secs: u64,

    /// Lifetime of a session, in hours.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: u64,

    /// Persist sessions to `root_dir` across restarts.
    #[serde(default = "default_true")]
    pub persist_sessions: bool,
}

/// Stake threshold and booking economics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicsConfig {
    /// Minimum staked amount to qualify as a host.
    #[serde(default = "default_min_host_stake")]
    pub min_host_stake: u64,

    /// Platform fee in basis points of the discounted subtotal.
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u32,

    /// Host deposit in basis points of the subtotal.
    #[serde(default = "default_host_deposit_bps")]
    pub host_deposit_bps: u32,

    /// Party that receives the stake discount.
    #[serde(default)]
    pub discount_side: DiscountSide,

    /// Discount step function, ordered by `min_stake`.
    #[serde(default = "default_discount_tiers")]
    pub discount_tiers: Vec<DiscountTier>,
}

/// Booking limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Longest allowed stay.
    #[serde(default = "default_max_booking_nights")]
    pub max_booking_nights: u32,
}

/// External stake ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base URL of the read-only ledger oracle. `None` uses the in-memory ledger.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Timeout for a single stake read, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Stake cache TTL in seconds (0 disables caching, capped at 30).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Stake cache capacity.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            auth: AuthConfig::default(),
            economics: EconomicsConfig::default(),
            booking: BookingConfig::default(),
            ledger: LedgerConfig::default(),
            sweep_interval_secs: default_sweep_interval(),
            log_level: default_log_level(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            nonce_ttl_secs: default_nonce_ttl(),
            session_ttl_hours: default_session_ttl(),
            persist_sessions: true,
        }
    }
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            min_host_stake: default_min_host_stake(),
            platform_fee_bps: default_platform_fee_bps(),
            host_deposit_bps: default_host_deposit_bps(),
            discount_side: DiscountSide::default(),
            discount_tiers: default_discount_tiers(),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_booking_nights: default_max_booking_nights(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            query_timeout_secs: default_query_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "stakestay")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".stakestay"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_domain() -> String {
    "stakestay.local".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_nonce_ttl() -> u64 {
    300
}

const fn default_session_ttl() -> u64 {
    24
}

const fn default_sweep_interval() -> u64 {
    60
}

const fn default_min_host_stake() -> u64 {
    1000
}

const fn default_platform_fee_bps() -> u32 {
    250
}

const fn default_host_deposit_bps() -> u32 {
    500
}

const fn default_max_booking_nights() -> u32 {
    365
}

const fn default_query_timeout() -> u64 {
    10
}

const fn default_cache_ttl() -> u64 {
    15
}

const fn default_cache_capacity() -> usize {
    10_000
}

fn default_discount_tiers() -> Vec<DiscountTier> {
    vec![
        DiscountTier {
            min_stake: 1_000,
            discount_bps: 500,
        },
        DiscountTier {
            min_stake: 5_000,
            discount_bps: 1_000,
        },
        DiscountTier {
            min_stake: 10_000,
            discount_bps: 1_500,
        },
        DiscountTier {
            min_stake: 50_000,
            discount_bps: 2_500,
        },
    ]
}

impl AuthConfig {
    /// Nonce lifetime, capped at [`MAX_NONCE_TTL_SECS`].
    #[must_use]
    pub fn nonce_ttl(&self) -> chrono::Duration {
        let secs = self.nonce_ttl_secs.min(MAX_NONCE_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    /// Session lifetime, capped at [`MAX_SESSION_TTL_HOURS`].
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        let hours = self.session_ttl_hours.min(MAX_SESSION_TTL_HOURS);
        chrono::Duration::hours(i64::try_from(hours).unwrap_or_default())
    }
}

impl LedgerConfig {
    /// Per-read timeout.
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Cache TTL, clamped to [`MAX_STAKE_CACHE_TTL_SECS`].
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        if self.cache_ttl_secs > MAX_STAKE_CACHE_TTL_SECS {
            warn!(
                "Stake cache TTL {}s exceeds {}s, clamping",
                self.cache_ttl_secs, MAX_STAKE_CACHE_TTL_SECS
            );
        }
        Duration::from_secs(self.cache_ttl_secs.min(MAX_STAKE_CACHE_TTL_SECS))
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails validation.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first violated constraint.
    pub fn validate(&self) -> crate::Result<()> {
        let econ = &self.economics;
        for (name, bps) in [
            ("platform_fee_bps", econ.platform_fee_bps),
            ("host_deposit_bps", econ.host_deposit_bps),
        ] {
            if bps > 10_000 {
                return Err(crate::Error::Config(format!(
                    "{name} must be at most 10000, got {bps}"
                )));
            }
        }

        for pair in econ.discount_tiers.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if hi.min_stake <= lo.min_stake || hi.discount_bps < lo.discount_bps {
                return Err(crate::Error::Config(
                    "discount_tiers must be strictly ordered by min_stake \
                     with non-decreasing discount_bps"
                        .to_string(),
                ));
            }
        }
        if econ.discount_tiers.iter().any(|t| t.discount_bps > 10_000) {
            return Err(crate::Error::Config(
                "discount_bps must be at most 10000".to_string(),
            ));
        }

        if self.auth.nonce_ttl_secs == 0 || self.auth.session_ttl_hours == 0 {
            return Err(crate::Error::Config(
                "nonce and session TTLs must be non-zero".to_string(),
            ));
        }
        if self.auth.nonce_ttl_secs > MAX_NONCE_TTL_SECS {
            return Err(crate::Error::Config(format!(
                "nonce_ttl_secs must be at most {MAX_NONCE_TTL_SECS}, got {}",
                self.auth.nonce_ttl_secs
            )));
        }
        if self.auth.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(crate::Error::Config(format!(
                "session_ttl_hours must be at most {MAX_SESSION_TTL_HOURS}, got {}",
                self.auth.session_ttl_hours
            )));
        }
        if self.booking.max_booking_nights == 0 {
            return Err(crate::Error::Config(
                "max_booking_nights must be non-zero".to_string(),
            ));
        }
        if self.ledger.query_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "ledger query_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
