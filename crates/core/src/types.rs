//! Core data types for loan monitoring.

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::OracleError;

/// Persisted watch record, one per loan ever activated.
///
/// `active` flips to false exactly once: either a completion event arrives or
/// this engine liquidates the loan. Records are never deleted (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanWatchRecord {
    pub loan_id: U256,
    pub borrower: Address,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// On-chain loan state, fetched fresh every evaluation cycle.
///
/// Never cached across ticks: partial repayments change `total_owed`.
/// Amounts are normalized to whole-token units by the chain client.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSnapshot {
    /// Collateral amount backing the loan
    pub collateral_amount: f64,
    /// Outstanding principal plus accrued interest
    pub total_owed: f64,
    /// Oracle feed pricing the collateral asset
    pub collateral_feed: B256,
    /// Oracle feed pricing the principal asset
    pub principal_feed: B256,
}

/// A price quote from the oracle network.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub feed_id: B256,
    pub price: f64,
    /// Time elapsed since the feed last updated
    pub age: Duration,
}

impl PriceQuote {
    /// Reject quotes that are stale or carry a non-positive price.
    ///
    /// A quote that fails here must never contribute to a liquidation
    /// decision; the caller treats it exactly like a fetch failure.
    pub fn validate(&self, max_age: Duration) -> Result<(), OracleError> {
        if self.age > max_age {
            return Err(OracleError::Stale {
                feed_id: self.feed_id,
                age_secs: self.age.as_secs(),
                bound_secs: max_age.as_secs(),
            });
        }
        if !(self.price > 0.0) || !self.price.is_finite() {
            return Err(OracleError::InvalidPrice {
                feed_id: self.feed_id,
                price: self.price,
            });
        }
        Ok(())
    }
}

/// Result of a health evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidationDecision {
    /// Collateral value divided by outstanding loan value
    pub ratio: f64,
    /// Ratio below which the loan is liquidated
    pub threshold: f64,
    pub should_liquidate: bool,
}

/// Inclusion receipt for a submitted liquidation transaction.
#[derive(Debug, Clone)]
pub struct LiquidationReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Loan lifecycle events consumed from the chain.
#[derive(Debug, Clone)]
pub enum LoanEvent {
    Activated {
        loan_id: U256,
        borrower: Address,
        activated_at: u64,
        deadline: u64,
    },
    Completed {
        loan_id: U256,
        borrower: Address,
        completed_at: u64,
    },
}

impl LoanEvent {
    /// Get the loan this event concerns.
    pub fn loan_id(&self) -> U256 {
        match self {
            Self::Activated { loan_id, .. } | Self::Completed { loan_id, .. } => *loan_id,
        }
    }

    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Activated { .. } => "LoanActivated",
            Self::Completed { .. } => "LoanCompleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_AGE: Duration = Duration::from_secs(60);

    fn quote(price: f64, age_secs: u64) -> PriceQuote {
        PriceQuote {
            feed_id: B256::repeat_byte(1),
            price,
            age: Duration::from_secs(age_secs),
        }
    }

    #[test]
    fn fresh_positive_quote_is_usable() {
        assert!(quote(2000.0, 10).validate(MAX_AGE).is_ok());
        // Exactly at the bound is still acceptable
        assert!(quote(2000.0, 60).validate(MAX_AGE).is_ok());
    }

    #[test]
    fn stale_quote_is_rejected() {
        let err = quote(2000.0, 61).validate(MAX_AGE).unwrap_err();
        assert!(matches!(err, OracleError::Stale { age_secs: 61, .. }));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        assert!(matches!(
            quote(0.0, 1).validate(MAX_AGE).unwrap_err(),
            OracleError::InvalidPrice { .. }
        ));
        assert!(matches!(
            quote(-1.0, 1).validate(MAX_AGE).unwrap_err(),
            OracleError::InvalidPrice { .. }
        ));
        assert!(matches!(
            quote(f64::NAN, 1).validate(MAX_AGE).unwrap_err(),
            OracleError::InvalidPrice { .. }
        ));
    }

    #[test]
    fn loan_event_accessors() {
        let event = LoanEvent::Activated {
            loan_id: U256::from(7u64),
            borrower: Address::repeat_byte(2),
            activated_at: 1700000000,
            deadline: 1700086400,
        };
        assert_eq!(event.loan_id(), U256::from(7u64));
        assert_eq!(event.event_type(), "LoanActivated");
    }
}
