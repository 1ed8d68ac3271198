//! WebSocket event listener for loan lifecycle events.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{Filter, Log};
use anyhow::Result;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tracing::{debug, info, warn};

use sentinel_core::LoanEvent;

use crate::contracts::event_signatures;

/// WebSocket listener producing `LoanEvent`s from the lending pool.
pub struct EventListener {
    /// WebSocket URL
    ws_url: String,
    /// Lending pool address
    pool_address: Address,
}

impl EventListener {
    pub fn new(ws_url: impl Into<String>, pool_address: Address) -> Self {
        Self {
            ws_url: ws_url.into(),
            pool_address,
        }
    }

    /// Subscribe to loan lifecycle events.
    /// Returns a stream of LoanEvent.
    pub async fn subscribe_loan_events(
        &self,
    ) -> Result<Pin<Box<dyn Stream<Item = LoanEvent> + Send>>> {
        info!(
            pool = %self.pool_address,
            ws_url = %self.ws_url,
            "Subscribing to loan events"
        );

        let ws = WsConnect::new(&self.ws_url);
        let provider = ProviderBuilder::new().on_ws(ws).await?;
        info!("WebSocket connected for loan events");

        let filter = Filter::new()
            .address(self.pool_address)
            .event_signature(event_signatures::loan_signatures());

        let sub = provider.subscribe_logs(&filter).await?;
        let inner_stream = sub.into_stream();

        // The provider must be kept in the stream's state to prevent the
        // WebSocket from closing
        let event_stream = futures::stream::unfold(
            (provider, inner_stream),
            |(_provider, mut stream)| async move {
                loop {
                    match stream.next().await {
                        Some(log) => {
                            if let Some(event) = parse_loan_event(log) {
                                return Some((event, (_provider, stream)));
                            }
                            // Skip logs that fail to parse
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(Box::pin(event_stream))
    }
}

/// Parse a log into a LoanEvent.
fn parse_loan_event(log: Log) -> Option<LoanEvent> {
    if log.topics().is_empty() {
        return None;
    }

    let sig = log.topics()[0];

    let event = if sig == event_signatures::LOAN_ACTIVATED {
        parse_activated_event(&log)
    } else if sig == event_signatures::LOAN_COMPLETED {
        parse_completed_event(&log)
    } else {
        None
    };

    match &event {
        Some(e) => debug!(
            loan_id = %e.loan_id(),
            event_type = e.event_type(),
            block = log.block_number.unwrap_or(0),
            "Parsed loan event"
        ),
        None => warn!(sig = %sig, "Failed to parse pool log"),
    }

    event
}

/// Parse LoanActivated event.
/// LoanActivated(uint256 indexed loanId, uint256 activatedAt, uint256 deadline, address indexed borrower)
fn parse_activated_event(log: &Log) -> Option<LoanEvent> {
    if log.topics().len() < 3 {
        return None;
    }

    let loan_id = U256::from_be_bytes(log.topics()[1].0);
    let borrower = Address::from_slice(&log.topics()[2][12..]);

    // Data: activatedAt (uint256), deadline (uint256)
    if log.data().data.len() < 64 {
        return None;
    }

    let activated_at = word_as_u64(&log.data().data[0..32]);
    let deadline = word_as_u64(&log.data().data[32..64]);

    Some(LoanEvent::Activated {
        loan_id,
        borrower,
        activated_at,
        deadline,
    })
}

/// Parse LoanCompleted event.
/// LoanCompleted(uint256 indexed loanId, address indexed borrower, uint256 completedAt)
fn parse_completed_event(log: &Log) -> Option<LoanEvent> {
    if log.topics().len() < 3 {
        return None;
    }

    let loan_id = U256::from_be_bytes(log.topics()[1].0);
    let borrower = Address::from_slice(&log.topics()[2][12..]);

    // Data: completedAt (uint256)
    if log.data().data.len() < 32 {
        return None;
    }

    let completed_at = word_as_u64(&log.data().data[0..32]);

    Some(LoanEvent::Completed {
        loan_id,
        borrower,
        completed_at,
    })
}

fn word_as_u64(word: &[u8]) -> u64 {
    U256::from_be_slice(word).saturating_to()
}
