//! Liquidation engine core logic.
//!
//! This crate provides the monitoring and execution core:
//! - Per-loan watcher tasks with cooperative cancellation
//! - Watcher supervisor with a loan-keyed registry (at most one watcher per loan)
//! - Pure collateralization health evaluation
//! - Liquidation execution with a mandatory on-chain liveness re-check
//! - Client traits for the chain, price oracle, and persistence backends
//!
//! Production backends live in `sentinel-chain` and `sentinel-store`; this
//! crate only depends on the trait seams so the whole engine runs against
//! test doubles.

pub mod clients;
pub mod config;
pub mod error;
mod executor;
mod health;
mod supervisor;
mod types;
mod watcher;

#[cfg(test)]
pub(crate) mod testkit;

pub use clients::{ChainClient, LoanStore, PriceOracle};
pub use config::EngineConfig;
pub use error::{ChainError, LiquidationError, OracleError, StoreError};
pub use executor::{LiquidationExecutor, LiquidationOutcome};
pub use health::{evaluate, Evaluation};
pub use supervisor::{WatcherRegistry, WatcherSupervisor};
pub use types::{
    LiquidationDecision, LiquidationReceipt, LoanEvent, LoanSnapshot, LoanWatchRecord, PriceQuote,
};
pub use watcher::Watcher;
