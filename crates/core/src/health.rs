//! Collateralization health evaluation.
//!
//! Pure arithmetic: callers are responsible for validating price quotes
//! (staleness, positivity) before evaluating. A stale or invalid quote must
//! yield "decision unavailable" upstream, never reach this function.

use crate::types::{LiquidationDecision, LoanSnapshot};

/// Outcome of evaluating a loan snapshot against two prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// A collateral ratio was computed.
    Decision(LiquidationDecision),
    /// `total_owed * principal_price == 0`: the loan was repaid in full
    /// between the chain read and this evaluation. No liquidation is needed;
    /// the caller should reconcile against on-chain state.
    NothingOwed,
}

/// Compute the liquidation decision for a loan.
///
/// `ratio = (collateral_amount * collateral_price) / (total_owed * principal_price)`,
/// liquidating when the ratio drops below `threshold`.
pub fn evaluate(
    snapshot: &LoanSnapshot,
    collateral_price: f64,
    principal_price: f64,
    threshold: f64,
) -> Evaluation {
    let collateral_value = snapshot.collateral_amount * collateral_price;
    let loan_value = snapshot.total_owed * principal_price;

    if loan_value == 0.0 {
        return Evaluation::NothingOwed;
    }

    let ratio = collateral_value / loan_value;
    Evaluation::Decision(LiquidationDecision {
        ratio,
        threshold,
        should_liquidate: ratio < threshold,
    })
}
