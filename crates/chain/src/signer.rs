//! Transaction signer and sender for liquidations.
//! Uses Alloy providers for type-safe RPC interactions.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use sentinel_core::{ChainError, LiquidationReceipt};

/// Signs and submits transactions, waiting for the inclusion receipt.
pub struct TransactionSender {
    rpc_url: String,
    wallet: EthereumWallet,
    /// Signer address
    pub address: Address,
    chain_id: u64,
    /// Bound on submission plus confirmation
    tx_timeout: Duration,
}

impl TransactionSender {
    /// Create a new transaction sender from a private key and verify the
    /// RPC endpoint is reachable.
    pub async fn new(
        private_key: &str,
        rpc_url: &str,
        chain_id: u64,
        tx_timeout: Duration,
    ) -> Result<Self> {
        // Parse private key (with or without 0x prefix)
        let key_str = private_key.trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str.parse()?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let nonce = provider.get_transaction_count(address).await?;

        info!(
            address = %address,
            chain_id = chain_id,
            nonce = nonce,
            "Transaction sender initialized"
        );

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            wallet,
            address,
            chain_id,
            tx_timeout,
        })
    }

    /// Send a transaction and block until it is included.
    ///
    /// Returns `ChainError::Reverted` on an unsuccessful receipt and
    /// `ChainError::Timeout` if confirmation does not arrive in time.
    pub async fn send_transaction(
        &self,
        to: Address,
        calldata: Bytes,
    ) -> Result<LiquidationReceipt, ChainError> {
        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.parse().map_err(ChainError::rpc)?);

        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata)
            .with_chain_id(self.chain_id);

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(ChainError::rpc)?;
        let tx_hash = *pending.tx_hash();

        info!(tx_hash = %tx_hash, "Transaction submitted, waiting for confirmation");

        let receipt = timeout(self.tx_timeout, pending.get_receipt())
            .await
            .map_err(|_| ChainError::Timeout(self.tx_timeout.as_secs()))?
            .map_err(ChainError::rpc)?;

        if receipt.status() {
            info!(
                tx_hash = %tx_hash,
                block = receipt.block_number.unwrap_or(0),
                gas_used = receipt.gas_used,
                "Transaction confirmed"
            );
            Ok(LiquidationReceipt {
                tx_hash,
                block_number: receipt.block_number.unwrap_or(0),
                gas_used: receipt.gas_used as u64,
            })
        } else {
            warn!(tx_hash = %tx_hash, "Transaction reverted");
            Err(ChainError::Reverted(tx_hash))
        }
    }
}
