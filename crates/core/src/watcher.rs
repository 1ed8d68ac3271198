//! Per-loan watcher task.
//!
//! Each watcher owns one loan: sleep for the poll interval, fetch a fresh
//! snapshot and two price quotes, evaluate health, and hand breaches to the
//! liquidation executor. Transient failures skip the tick and never
//! terminate the loop. A stop signal is honored at the top of each
//! iteration and during the inter-tick sleep, but never interrupts an
//! in-flight liquidation call.

use alloy::primitives::{B256, U256};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clients::{ChainClient, LoanStore, PriceOracle};
use crate::config::EngineConfig;
use crate::error::{ChainError, OracleError};
use crate::executor::{LiquidationExecutor, LiquidationOutcome};
use crate::health::{evaluate, Evaluation};
use crate::supervisor::WatcherRegistry;
use crate::types::{LoanSnapshot, PriceQuote};

/// Why a watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    /// This engine liquidated the loan.
    Liquidated,
    /// The loan was found already resolved on-chain and the record reconciled.
    Reconciled,
    /// External stop signal (loan completion).
    Signalled,
}

/// What a single tick decided.
enum TickOutcome {
    Continue,
    Liquidated,
    Reconciled,
}

/// Supervised task monitoring a single loan.
pub struct Watcher {
    loan_id: U256,
    /// Registry generation of this watcher's entry
    generation: u64,
    chain: Arc<dyn ChainClient>,
    oracle: Arc<dyn PriceOracle>,
    store: Arc<dyn LoanStore>,
    executor: Arc<LiquidationExecutor>,
    registry: Arc<WatcherRegistry>,
    config: EngineConfig,
    stop_rx: watch::Receiver<bool>,
}

impl Watcher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        loan_id: U256,
        generation: u64,
        chain: Arc<dyn ChainClient>,
        oracle: Arc<dyn PriceOracle>,
        store: Arc<dyn LoanStore>,
        executor: Arc<LiquidationExecutor>,
        registry: Arc<WatcherRegistry>,
        config: EngineConfig,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            loan_id,
            generation,
            chain,
            oracle,
            store,
            executor,
            registry,
            config,
            stop_rx,
        }
    }

    /// Run the watch loop until liquidation, reconciliation, or stop signal,
    /// then deregister from the supervisor's registry.
    pub async fn run(mut self) {
        info!(
            loan_id = %self.loan_id,
            poll_interval_secs = self.config.poll_interval_secs,
            "Watcher started"
        );

        let reason = self.watch_loop().await;

        self.registry.remove(self.loan_id, self.generation);
        info!(loan_id = %self.loan_id, reason = ?reason, "Watcher terminated");
    }

    async fn watch_loop(&mut self) -> StopReason {
        loop {
            // Observe a stop that arrived while the previous tick ran.
            if *self.stop_rx.borrow_and_update() {
                return StopReason::Signalled;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
                // A closed channel means the supervisor is gone; stop either way.
                _ = self.stop_rx.changed() => return StopReason::Signalled,
            }

            match self.tick().await {
                TickOutcome::Continue => {}
                TickOutcome::Liquidated => return StopReason::Liquidated,
                TickOutcome::Reconciled => return StopReason::Reconciled,
            }
        }
    }

    /// One evaluation cycle: snapshot, quotes, decision, maybe liquidate.
    async fn tick(&self) -> TickOutcome {
        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(loan_id = %self.loan_id, error = %e, "Loan fetch failed, skipping tick");
                return TickOutcome::Continue;
            }
        };

        let (collateral, principal) = match self.fetch_quotes(&snapshot).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(loan_id = %self.loan_id, error = %e, "Price fetch failed, skipping tick");
                return TickOutcome::Continue;
            }
        };

        match evaluate(
            &snapshot,
            collateral.price,
            principal.price,
            self.config.liquidation_threshold,
        ) {
            Evaluation::NothingOwed => self.reconcile().await,
            Evaluation::Decision(decision) if decision.should_liquidate => {
                info!(
                    loan_id = %self.loan_id,
                    ratio = decision.ratio,
                    threshold = decision.threshold,
                    collateral_price = collateral.price,
                    principal_price = principal.price,
                    "Loan undercollateralized, liquidating"
                );
                match self.executor.liquidate(self.loan_id).await {
                    Ok(LiquidationOutcome::Liquidated(_)) => TickOutcome::Liquidated,
                    Ok(LiquidationOutcome::AlreadyResolved) => TickOutcome::Reconciled,
                    Err(e) => {
                        warn!(
                            loan_id = %self.loan_id,
                            error = %e,
                            "Liquidation attempt failed, retrying next tick"
                        );
                        TickOutcome::Continue
                    }
                }
            }
            Evaluation::Decision(decision) => {
                debug!(
                    loan_id = %self.loan_id,
                    ratio = decision.ratio,
                    threshold = decision.threshold,
                    "Loan healthy"
                );
                TickOutcome::Continue
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<LoanSnapshot, ChainError> {
        timeout(self.config.rpc_timeout(), self.chain.get_loan(self.loan_id))
            .await
            .map_err(|_| ChainError::Timeout(self.config.rpc_timeout_secs))?
    }

    /// Fetch and validate both quotes. Either one failing the staleness or
    /// validity check makes the decision unavailable for this tick.
    async fn fetch_quotes(
        &self,
        snapshot: &LoanSnapshot,
    ) -> Result<(PriceQuote, PriceQuote), OracleError> {
        let (collateral, principal) = tokio::join!(
            self.fetch_quote(snapshot.collateral_feed),
            self.fetch_quote(snapshot.principal_feed),
        );
        let collateral = collateral?;
        let principal = principal?;

        let max_age = self.config.price_max_age();
        collateral.validate(max_age)?;
        principal.validate(max_age)?;

        Ok((collateral, principal))
    }

    async fn fetch_quote(&self, feed_id: B256) -> Result<PriceQuote, OracleError> {
        timeout(self.config.rpc_timeout(), self.oracle.get_price(feed_id))
            .await
            .map_err(|_| OracleError::Unavailable {
                feed_id,
                reason: format!("timed out after {}s", self.config.rpc_timeout_secs),
            })?
    }

    /// The snapshot showed nothing owed: re-check the chain. If the loan is
    /// resolved there but our record is still active, reconcile and stop;
    /// otherwise keep watching and let the completion event close it out.
    async fn reconcile(&self) -> TickOutcome {
        let active = match timeout(
            self.config.rpc_timeout(),
            self.chain.is_loan_active(self.loan_id),
        )
        .await
        {
            Ok(Ok(active)) => active,
            Ok(Err(e)) => {
                warn!(loan_id = %self.loan_id, error = %e, "Liveness check failed, skipping tick");
                return TickOutcome::Continue;
            }
            Err(_) => {
                warn!(loan_id = %self.loan_id, "Liveness check timed out, skipping tick");
                return TickOutcome::Continue;
            }
        };

        if active {
            debug!(loan_id = %self.loan_id, "Nothing owed but loan still open, keeping watch");
            return TickOutcome::Continue;
        }

        warn!(
            loan_id = %self.loan_id,
            "Watch record active but loan resolved on-chain, reconciling to inactive"
        );
        match self.store.deactivate(self.loan_id).await {
            Ok(()) => TickOutcome::Reconciled,
            Err(e) => {
                warn!(loan_id = %self.loan_id, error = %e, "Reconcile failed, retrying next tick");
                TickOutcome::Continue
            }
        }
    }
}
