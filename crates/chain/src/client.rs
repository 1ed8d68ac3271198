//! Production `ChainClient` backed by the lending pool contract.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::sol_types::SolCall;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use sentinel_core::{ChainClient, ChainError, LiquidationReceipt, LoanSnapshot};

use crate::contracts::ILendingPool;
use crate::signer::TransactionSender;
use crate::units::u256_to_f64;

/// Pool amounts are 18-decimal fixed point.
const AMOUNT_DECIMALS: u8 = 18;

/// Lending pool client for loan reads and liquidation submission.
pub struct LendingChainClient {
    http_url: String,
    pool_address: Address,
    sender: Arc<TransactionSender>,
}

impl LendingChainClient {
    /// Create the client and verify the RPC endpoint is reachable.
    /// Connectivity failure here is a fatal startup error.
    pub async fn connect(
        http_url: &str,
        pool_address: Address,
        sender: Arc<TransactionSender>,
    ) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(http_url.parse()?);
        let block = provider.get_block_number().await?;
        info!(
            pool = %pool_address,
            block = block,
            "Chain client connected"
        );

        Ok(Self {
            http_url: http_url.to_string(),
            pool_address,
            sender,
        })
    }

    async fn fetch_loan(
        &self,
        loan_id: U256,
    ) -> Result<ILendingPool::getLoanReturn, ChainError> {
        let provider = ProviderBuilder::new()
            .on_http(self.http_url.parse().map_err(ChainError::rpc)?);
        let pool = ILendingPool::new(self.pool_address, &provider);

        let ret = pool
            .getLoan(loan_id)
            .call()
            .await
            .map_err(ChainError::rpc)?;

        // An unset struct means the pool has no such loan
        if ret.loan.borrower == Address::ZERO {
            return Err(ChainError::LoanNotFound(loan_id));
        }

        Ok(ret)
    }
}

#[async_trait]
impl ChainClient for LendingChainClient {
    async fn get_loan(&self, loan_id: U256) -> Result<LoanSnapshot, ChainError> {
        let ret = self.fetch_loan(loan_id).await?;

        let snapshot = LoanSnapshot {
            collateral_amount: u256_to_f64(ret.loan.collateralAmount, AMOUNT_DECIMALS),
            total_owed: u256_to_f64(ret.totalOwed, AMOUNT_DECIMALS),
            collateral_feed: ret.feedIds[0],
            principal_feed: ret.feedIds[1],
        };

        debug!(
            loan_id = %loan_id,
            collateral_amount = snapshot.collateral_amount,
            total_owed = snapshot.total_owed,
            "Fetched loan snapshot"
        );

        Ok(snapshot)
    }

    async fn is_loan_active(&self, loan_id: U256) -> Result<bool, ChainError> {
        match self.fetch_loan(loan_id).await {
            Ok(ret) => Ok(ret.loan.active),
            // A loan the pool no longer knows is not active
            Err(ChainError::LoanNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn liquidate_loan(
        &self,
        loan_id: U256,
        owner_account: Address,
    ) -> Result<LiquidationReceipt, ChainError> {
        let calldata = ILendingPool::singleLoanLiquidationCall {
            loanId: loan_id,
            ownerAccount: owner_account,
        }
        .abi_encode();

        self.sender
            .send_transaction(self.pool_address, calldata.into())
            .await
    }
}
