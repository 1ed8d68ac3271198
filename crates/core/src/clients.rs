//! Client traits for the engine's external collaborators.
//!
//! The supervisor, watchers, and executor only know these traits; production
//! implementations live in `sentinel-chain` (RPC) and `sentinel-store`
//! (Postgres), and tests inject in-memory doubles. All implementations must
//! be safe for concurrent use across watcher tasks.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::{ChainError, OracleError, StoreError};
use crate::types::{LiquidationReceipt, LoanSnapshot, LoanWatchRecord, PriceQuote};

/// Reads loan state and submits liquidation transactions.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch the current on-chain state of a loan.
    async fn get_loan(&self, loan_id: U256) -> Result<LoanSnapshot, ChainError>;

    /// Check whether a loan is still open on-chain.
    async fn is_loan_active(&self, loan_id: U256) -> Result<bool, ChainError>;

    /// Submit a liquidation and wait for the inclusion receipt.
    ///
    /// Returns an error if the transaction reverts or confirmation times out.
    async fn liquidate_loan(
        &self,
        loan_id: U256,
        owner_account: Address,
    ) -> Result<LiquidationReceipt, ChainError>;
}

/// Resolves a feed identifier to a fresh price quote.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, feed_id: B256) -> Result<PriceQuote, OracleError>;
}

/// Durable table of loans currently believed to require monitoring.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// All records with `active = true`.
    async fn active_loans(&self) -> Result<Vec<LoanWatchRecord>, StoreError>;

    /// Create or re-activate the record for a loan. Idempotent under
    /// duplicate event delivery.
    async fn upsert_active(
        &self,
        loan_id: U256,
        borrower: Address,
    ) -> Result<LoanWatchRecord, StoreError>;

    /// Flip a record to `active = false`. Idempotent: deactivating an
    /// already-inactive record is a no-op.
    async fn deactivate(&self, loan_id: U256) -> Result<(), StoreError>;
}
