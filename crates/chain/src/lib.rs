//! Chain interaction layer for the liquidation engine.
//!
//! This crate provides:
//! - `sol!` bindings for the lending pool and price feed registry
//! - The production `ChainClient` (loan reads, liquidation submission)
//! - The production `PriceOracle` backed by the on-chain feed registry
//! - A WebSocket event listener producing loan lifecycle events
//! - Transaction signing and confirmation waiting

mod client;
mod contracts;
mod events;
mod oracle;
mod signer;
mod units;

pub use client::LendingChainClient;
pub use contracts::{event_signatures, ILendingPool, IPriceFeedRegistry};
pub use events::EventListener;
pub use oracle::FeedRegistryOracle;
pub use signer::TransactionSender;
