//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use stakestay::config::{DiscountSide, EngineConfig};
use std::path::PathBuf;

/// Stake-gated booking authorization engine.
#[derive(Parser, Debug)]
#[command(name = "stakestay-node")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory for engine data.
    #[arg(long, env = "STAKESTAY_ROOT_DIR")]
    pub root_dir: Option<PathBuf>,

    /// Base URL of the stake ledger oracle (in-memory ledger when unset).
    #[arg(long, env = "STAKESTAY_LEDGER_ENDPOINT")]
    pub ledger_endpoint: Option<String>,

    /// Domain bound into login challenges.
    #[arg(long, env = "STAKESTAY_DOMAIN")]
    pub domain: Option<String>,

    /// Minimum stake to qualify as a host.
    #[arg(long, env = "STAKESTAY_MIN_HOST_STAKE")]
    pub min_host_stake: Option<u64>,

    /// Party receiving the stake discount.
    #[arg(long, value_enum, env = "STAKESTAY_DISCOUNT_SIDE")]
    pub discount_side: Option<CliDiscountSide>,

    /// Do not persist sessions across restarts.
    #[arg(long)]
    pub ephemeral_sessions: bool,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text", env = "STAKESTAY_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Log format CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Discount side CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDiscountSide {
    /// Discount the guest's subtotal.
    Guest,
    /// Discount the host deposit.
    HostDeposit,
}

impl Cli {
    /// Convert CLI arguments into an `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<EngineConfig> {
        let mut config = if let Some(ref path) = self.config {
            EngineConfig::from_file(path)?
        } else {
            EngineConfig::default()
        };

        if let Some(root_dir) = self.root_dir {
            config.root_dir = root_dir;
        }
        if let Some(endpoint) = self.ledger_endpoint {
            config.ledger.endpoint = Some(endpoint);
        }
        if let Some(domain) = self.domain {
            config.auth.domain = domain;
        }
        if let Some(min) = self.min_host_stake {
            config.economics.min_host_stake = min;
        }
        if let Some(side) = self.discount_side {
            config.economics.discount_side = side.into();
        }
        if self.ephemeral_sessions {
            config.auth.persist_sessions = false;
        }
        config.log_level = self.log_level;

        Ok(config)
    }
}

impl From<CliDiscountSide> for DiscountSide {
    fn from(s: CliDiscountSide) -> Self {
        match s {
            CliDiscountSide::Guest => DiscountSide::Guest,
            CliDiscountSide::HostDeposit => DiscountSide::HostDeposit,
        }
    }
}
