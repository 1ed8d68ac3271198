//! Loan Sentinel
//!
//! Liquidation monitoring and execution engine for a fixed-term lending pool.
//! Features:
//! - One watcher task per active loan, restored from Postgres at boot
//! - Event-driven activation/completion via WebSocket subscriptions
//! - Collateral ratio evaluation against on-chain price feeds
//! - Idempotent liquidation submission with confirmation waiting

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sentinel_chain::{EventListener, FeedRegistryOracle, LendingChainClient, TransactionSender};
use sentinel_core::{EngineConfig, WatcherSupervisor};
use sentinel_store::PgLoanStore;

/// Environment variable names.
mod env {
    pub const RPC_HTTP_URL: &str = "RPC_HTTP_URL";
    pub const RPC_WS_URL: &str = "RPC_WS_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const LENDING_POOL: &str = "LENDING_POOL";
    pub const FEED_REGISTRY: &str = "FEED_REGISTRY";
    pub const LIQUIDATOR_ACCOUNT: &str = "LIQUIDATOR_ACCOUNT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
}

/// Delay before reconnecting a dropped event subscription.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sentinel_core=debug,sentinel_chain=debug")),
        )
        .init();

    let engine_config = EngineConfig::from_env();
    engine_config.log_config();

    info!("Starting Loan Sentinel");

    let config = load_config()?;

    // Position store: unreachable database at boot is fatal
    let store = Arc::new(
        PgLoanStore::connect(&config.database_url)
            .await
            .context("Failed to connect to position store")?,
    );

    let tx_sender = Arc::new(
        TransactionSender::new(
            &config.private_key,
            &config.http_url,
            config.chain_id,
            engine_config.tx_timeout(),
        )
        .await
        .context("Failed to initialize transaction sender")?,
    );

    let chain = Arc::new(
        LendingChainClient::connect(&config.http_url, config.lending_pool, tx_sender)
            .await
            .context("Failed to connect chain client")?,
    );

    let oracle = Arc::new(FeedRegistryOracle::new(
        &config.http_url,
        config.feed_registry,
    ));

    let supervisor = WatcherSupervisor::new(
        chain,
        oracle,
        store,
        config.liquidator_account,
        engine_config,
    );

    // Restore watchers for every loan persisted as active
    let restored = supervisor
        .restore()
        .await
        .context("Failed to restore watchers from position store")?;
    info!(restored = restored, "Boot restore complete");

    let listener = EventListener::new(&config.ws_url, config.lending_pool);

    // The first subscription must succeed; later drops are retried
    let events = listener
        .subscribe_loan_events()
        .await
        .context("Failed to subscribe to loan events")?;

    info!("Starting main event loop");

    tokio::select! {
        _ = run_event_loop(&supervisor, &listener, events) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    supervisor.shutdown().await;

    Ok(())
}

/// Drive the supervisor from the event subscription, reconnecting whenever
/// the WebSocket stream ends.
async fn run_event_loop(
    supervisor: &WatcherSupervisor,
    listener: &EventListener,
    mut events: std::pin::Pin<Box<dyn futures::Stream<Item = sentinel_core::LoanEvent> + Send>>,
) {
    loop {
        supervisor.run(events).await;

        warn!(
            delay_secs = RECONNECT_DELAY.as_secs(),
            "Event subscription ended, reconnecting"
        );

        events = loop {
            tokio::time::sleep(RECONNECT_DELAY).await;
            match listener.subscribe_loan_events().await {
                Ok(stream) => break stream,
                Err(e) => warn!(error = %e, "Resubscription failed, retrying"),
            }
        };
    }
}

/// Configuration loaded from environment.
struct Config {
    http_url: String,
    ws_url: String,
    private_key: String,
    chain_id: u64,
    lending_pool: alloy::primitives::Address,
    feed_registry: alloy::primitives::Address,
    liquidator_account: alloy::primitives::Address,
    database_url: String,
}

fn load_config() -> Result<Config> {
    let get_env = |name: &str| -> Result<String> {
        std::env::var(name).map_err(|_| anyhow::anyhow!("Missing env var: {}", name))
    };

    let get_address = |name: &str| -> Result<alloy::primitives::Address> {
        get_env(name)?
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid address for {}: {}", name, e))
    };

    Ok(Config {
        http_url: get_env(env::RPC_HTTP_URL)?,
        ws_url: get_env(env::RPC_WS_URL)?,
        private_key: get_env(env::PRIVATE_KEY)?,
        chain_id: get_env(env::CHAIN_ID)?
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", env::CHAIN_ID, e))?,
        lending_pool: get_address(env::LENDING_POOL)?,
        feed_registry: get_address(env::FEED_REGISTRY)?,
        liquidator_account: get_address(env::LIQUIDATOR_ACCOUNT)?,
        database_url: get_env(env::DATABASE_URL)?,
    })
}
