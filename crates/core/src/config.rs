//! Engine configuration.
//!
//! All knobs come from environment variables with production defaults; the
//! binary loads a `.env` file first via dotenvy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters for watchers and the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between health evaluations of a loan
    pub poll_interval_secs: u64,
    /// Collateral ratio below which a loan is liquidated
    pub liquidation_threshold: f64,
    /// Maximum acceptable age of a price quote
    pub price_max_age_secs: u64,
    /// Per-call timeout for chain and oracle reads
    pub rpc_timeout_secs: u64,
    /// Timeout for liquidation submission plus confirmation
    pub tx_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            liquidation_threshold: 1.05,
            price_max_age_secs: 60,
            rpc_timeout_secs: 10,
            tx_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Build from environment variables, falling back to defaults for any
    /// that are unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            liquidation_threshold: env_parse(
                "LIQUIDATION_THRESHOLD",
                defaults.liquidation_threshold,
            ),
            price_max_age_secs: env_parse("PRICE_MAX_AGE_SECS", defaults.price_max_age_secs),
            rpc_timeout_secs: env_parse("RPC_TIMEOUT_SECS", defaults.rpc_timeout_secs),
            tx_timeout_secs: env_parse("TX_TIMEOUT_SECS", defaults.tx_timeout_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn price_max_age(&self) -> Duration {
        Duration::from_secs(self.price_max_age_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }

    /// Log the active configuration at startup.
    pub fn log_config(&self) {
        tracing::info!(
            poll_interval_secs = self.poll_interval_secs,
            liquidation_threshold = self.liquidation_threshold,
            price_max_age_secs = self.price_max_age_secs,
            rpc_timeout_secs = self.rpc_timeout_secs,
            tx_timeout_secs = self.tx_timeout_secs,
            "Engine configuration loaded"
        );
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
