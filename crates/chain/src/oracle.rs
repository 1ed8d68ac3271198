//! Production `PriceOracle` backed by the on-chain feed registry.

use alloy::primitives::{Address, B256};
use alloy::providers::ProviderBuilder;
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use sentinel_core::{OracleError, PriceOracle, PriceQuote};

use crate::contracts::IPriceFeedRegistry;
use crate::units::u256_to_f64;

/// Oracle reading prices from the feed registry contract.
pub struct FeedRegistryOracle {
    http_url: String,
    registry_address: Address,
}

impl FeedRegistryOracle {
    pub fn new(http_url: &str, registry_address: Address) -> Self {
        Self {
            http_url: http_url.to_string(),
            registry_address,
        }
    }
}

#[async_trait]
impl PriceOracle for FeedRegistryOracle {
    async fn get_price(&self, feed_id: B256) -> Result<PriceQuote, OracleError> {
        let provider = ProviderBuilder::new().on_http(
            self.http_url
                .parse()
                .map_err(|e| OracleError::Unavailable {
                    feed_id,
                    reason: format!("invalid RPC url: {e}"),
                })?,
        );
        let registry = IPriceFeedRegistry::new(self.registry_address, &provider);

        let ret = registry
            .getPrice(feed_id)
            .call()
            .await
            .map_err(|e| OracleError::Unavailable {
                feed_id,
                reason: e.to_string(),
            })?;

        // The registry reports signed prices; anything non-positive is unusable
        if ret.price.is_negative() || ret.price.is_zero() {
            return Err(OracleError::InvalidPrice {
                feed_id,
                price: ret.price.to_string().parse::<f64>().unwrap_or(0.0),
            });
        }

        let price = u256_to_f64(ret.price.unsigned_abs(), ret.decimals);

        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let updated_at: u64 = ret.updatedAt.saturating_to();
        let age = Duration::from_secs(now_secs.saturating_sub(updated_at));

        debug!(feed_id = %feed_id, price = price, age_secs = age.as_secs(), "Fetched price");

        Ok(PriceQuote {
            feed_id,
            price,
            age,
        })
    }
}
