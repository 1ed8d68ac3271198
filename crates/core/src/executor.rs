//! Liquidation executor.
//!
//! Submits the liquidation transaction, waits for confirmation, and flips the
//! persisted watch record to inactive. Every attempt starts with an on-chain
//! liveness re-check so a loan that another actor (or a prior retry) already
//! resolved is never liquidated twice.

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::clients::{ChainClient, LoanStore};
use crate::error::{ChainError, LiquidationError};
use crate::types::LiquidationReceipt;

/// Outcome of a liquidation attempt.
#[derive(Debug)]
pub enum LiquidationOutcome {
    /// Transaction confirmed and the watch record deactivated.
    Liquidated(LiquidationReceipt),
    /// The loan was already resolved on-chain; the local record was
    /// reconciled to inactive without submitting anything.
    AlreadyResolved,
}

/// Executes liquidations against the lending contract.
pub struct LiquidationExecutor {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn LoanStore>,
    /// Account credited by `singleLoanLiquidation`
    owner_account: Address,
    /// Bound on the liveness re-check
    rpc_timeout: Duration,
    /// Bound on submission plus confirmation
    tx_timeout: Duration,
}

impl LiquidationExecutor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn LoanStore>,
        owner_account: Address,
        rpc_timeout: Duration,
        tx_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            store,
            owner_account,
            rpc_timeout,
            tx_timeout,
        }
    }

    /// Liquidate a loan.
    ///
    /// On error the caller retries on its next tick; the liveness re-check at
    /// the top of this method is what keeps retries idempotent. In the
    /// success path the watch record is deactivated before returning, so the
    /// calling watcher may terminate immediately.
    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn liquidate(&self, loan_id: U256) -> Result<LiquidationOutcome, LiquidationError> {
        let active = timeout(self.rpc_timeout, self.chain.is_loan_active(loan_id))
            .await
            .map_err(|_| ChainError::Timeout(self.rpc_timeout.as_secs()))??;
        if !active {
            warn!(
                loan_id = %loan_id,
                "Loan already resolved on-chain, reconciling local record"
            );
            self.store.deactivate(loan_id).await?;
            return Ok(LiquidationOutcome::AlreadyResolved);
        }

        let receipt = timeout(
            self.tx_timeout,
            self.chain.liquidate_loan(loan_id, self.owner_account),
        )
        .await
        .map_err(|_| ChainError::Timeout(self.tx_timeout.as_secs()))??;

        info!(
            loan_id = %loan_id,
            tx_hash = %receipt.tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "Liquidation transaction confirmed"
        );

        self.store.deactivate(loan_id).await?;

        Ok(LiquidationOutcome::Liquidated(receipt))
    }
}
