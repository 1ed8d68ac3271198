//! Error taxonomy for the liquidation engine.
//!
//! Per-loan errors (`ChainError`, `OracleError`, `StoreError`,
//! `LiquidationError`) stay contained inside that loan's watcher: the tick is
//! skipped or retried and the watcher keeps running. Only startup-time
//! connectivity failures are fatal, and those propagate as `anyhow` errors
//! from the binary entry point.

use alloy::primitives::{B256, U256};
use thiserror::Error;

/// Chain read/write failures. Reads are transient (skip the tick); write
/// failures are wrapped in [`LiquidationError`] and retried next tick.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("loan {0} not found on-chain")]
    LoanNotFound(U256),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("chain call timed out after {0}s")]
    Timeout(u64),
}

impl ChainError {
    /// Wrap a transport-level error.
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        Self::Rpc(err.to_string())
    }
}

/// Price quote failures, including staleness and validity rejection.
/// Always transient: the affected tick is skipped.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("feed {feed_id} unavailable: {reason}")]
    Unavailable { feed_id: B256, reason: String },

    #[error("quote for feed {feed_id} is {age_secs}s old (staleness bound {bound_secs}s)")]
    Stale {
        feed_id: B256,
        age_secs: u64,
        bound_secs: u64,
    },

    #[error("invalid price {price} for feed {feed_id}")]
    InvalidPrice { feed_id: B256, price: f64 },
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("no watch record for loan {0}")]
    NotFound(U256),
}

impl StoreError {
    /// Wrap a backend database error.
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Failure of a liquidation attempt. The watcher logs it and re-evaluates on
/// its next tick; resubmission is always preceded by a liveness re-check.
#[derive(Debug, Error)]
pub enum LiquidationError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
