//! Watcher supervisor.
//!
//! Top-level coordinator: restores watchers for persisted active loans at
//! boot, spawns one on each activation event, and tears one down on
//! completion. The registry is the single source of truth for which loans
//! are being watched and enforces the at-most-one-watcher-per-loan
//! invariant across boot-time restore and event-time spawns.

use alloy::primitives::{Address, U256};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clients::{ChainClient, LoanStore, PriceOracle};
use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::executor::LiquidationExecutor;
use crate::types::LoanEvent;
use crate::watcher::Watcher;

/// Live watcher entry: stop signal, the task itself, and the generation
/// stamped when the entry was installed.
pub(crate) struct WatcherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    generation: u64,
}

/// Registry mapping `loan_id` to its live watcher.
///
/// All spawns go through [`try_insert_with`](Self::try_insert_with) so that
/// concurrent activation events and boot-time restore can never produce two
/// evaluating watchers for the same loan. Watchers remove their own entry on
/// exit; the removal is generation-checked so a watcher that was replaced
/// while draining cannot evict its successor.
#[derive(Default)]
pub struct WatcherRegistry {
    inner: DashMap<U256, WatcherHandle>,
    generations: AtomicU64,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, loan_id: U256) -> bool {
        self.inner.contains_key(&loan_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn loan_ids(&self) -> Vec<U256> {
        self.inner.iter().map(|e| *e.key()).collect()
    }

    /// Insert a handle built by `make` unless the loan already has a live
    /// watcher. An occupied slot whose watcher was already signalled to stop
    /// (or whose task finished without deregistering) is replaced: the
    /// incumbent does no further evaluation, so a re-activation arriving in
    /// that window must re-enter watching instead of being dropped.
    /// The entry guard is held across `make`, so a racing spawn for the same
    /// loan observes the occupied slot instead of double-spawning.
    pub(crate) fn try_insert_with(
        &self,
        loan_id: U256,
        make: impl FnOnce(u64) -> WatcherHandle,
    ) -> bool {
        match self.inner.entry(loan_id) {
            Entry::Occupied(mut slot) => {
                let stopping = {
                    let handle = slot.get();
                    *handle.stop.borrow() || handle.task.is_finished()
                };
                if !stopping {
                    return false;
                }
                slot.insert(make(self.next_generation()));
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(make(self.next_generation()));
                true
            }
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    /// Signal the watcher for a loan to stop. Returns false if none is live.
    pub(crate) fn signal_stop(&self, loan_id: U256) -> bool {
        match self.inner.get(&loan_id) {
            Some(handle) => {
                // Send fails only if the watcher already exited
                let _ = handle.stop.send(true);
                true
            }
            None => false,
        }
    }

    /// Remove an entry; called by each watcher as it terminates. Only the
    /// entry the watcher itself installed is removed, never a replacement.
    pub(crate) fn remove(&self, loan_id: U256, generation: u64) {
        self.inner
            .remove_if(&loan_id, |_, handle| handle.generation == generation);
    }

    /// Take every handle out of the registry (graceful shutdown).
    fn drain(&self) -> Vec<(U256, WatcherHandle)> {
        let ids = self.loan_ids();
        ids.into_iter()
            .filter_map(|id| self.inner.remove(&id))
            .collect()
    }
}

/// Top-level coordinator owning the registry and shared clients.
pub struct WatcherSupervisor {
    chain: Arc<dyn ChainClient>,
    oracle: Arc<dyn PriceOracle>,
    store: Arc<dyn LoanStore>,
    executor: Arc<LiquidationExecutor>,
    registry: Arc<WatcherRegistry>,
    config: EngineConfig,
}

impl WatcherSupervisor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        oracle: Arc<dyn PriceOracle>,
        store: Arc<dyn LoanStore>,
        owner_account: Address,
        config: EngineConfig,
    ) -> Self {
        let executor = Arc::new(LiquidationExecutor::new(
            chain.clone(),
            store.clone(),
            owner_account,
            config.rpc_timeout(),
            config.tx_timeout(),
        ));
        Self {
            chain,
            oracle,
            store,
            executor,
            registry: Arc::new(WatcherRegistry::new()),
            config,
        }
    }

    pub fn registry(&self) -> &WatcherRegistry {
        &self.registry
    }

    /// Restore watchers for every persisted active loan.
    ///
    /// Store unavailability here is fatal: the engine cannot safely operate
    /// without knowing the active set, so the error propagates to `main`.
    pub async fn restore(&self) -> Result<usize, StoreError> {
        let records = self.store.active_loans().await?;
        let mut spawned = 0;

        for record in &records {
            if self.spawn_watcher(record.loan_id) {
                spawned += 1;
            }
        }

        info!(
            active_records = records.len(),
            spawned = spawned,
            "Restored watchers from position store"
        );
        Ok(spawned)
    }

    /// Consume loan lifecycle events until the stream ends.
    ///
    /// Per-event handler errors (malformed events, store hiccups) are logged
    /// and never kill the subscription loop.
    pub async fn run<S>(&self, mut events: S)
    where
        S: Stream<Item = LoanEvent> + Unpin,
    {
        info!("Supervisor event loop started");

        while let Some(event) = events.next().await {
            let loan_id = event.loan_id();
            info!(
                event_type = event.event_type(),
                loan_id = %loan_id,
                "Loan event received"
            );

            let result = match event {
                LoanEvent::Activated { loan_id, borrower, .. } => {
                    self.on_loan_activated(loan_id, borrower).await
                }
                LoanEvent::Completed { loan_id, .. } => self.on_loan_completed(loan_id).await,
            };

            if let Err(e) = result {
                warn!(loan_id = %loan_id, error = %e, "Failed to process loan event");
            }
        }

        warn!("Loan event stream ended");
    }

    /// Handle a loan activation: idempotent record upsert plus
    /// spawn-if-absent. Safe under duplicate event delivery.
    pub async fn on_loan_activated(
        &self,
        loan_id: U256,
        borrower: Address,
    ) -> Result<(), StoreError> {
        self.store.upsert_active(loan_id, borrower).await?;

        if self.spawn_watcher(loan_id) {
            info!(loan_id = %loan_id, borrower = %borrower, "Watcher spawned for activated loan");
        }
        Ok(())
    }

    /// Handle a loan completion: deactivate the record and signal the
    /// watcher (if any) to stop.
    pub async fn on_loan_completed(&self, loan_id: U256) -> Result<(), StoreError> {
        self.store.deactivate(loan_id).await?;

        if self.registry.signal_stop(loan_id) {
            info!(loan_id = %loan_id, "Stop signalled to watcher for completed loan");
        }
        Ok(())
    }

    /// Spawn a watcher unless a live one is already registered for this loan.
    fn spawn_watcher(&self, loan_id: U256) -> bool {
        self.registry.try_insert_with(loan_id, |generation| {
            let (stop_tx, stop_rx) = watch::channel(false);
            let watcher = Watcher::new(
                loan_id,
                generation,
                self.chain.clone(),
                self.oracle.clone(),
                self.store.clone(),
                self.executor.clone(),
                self.registry.clone(),
                self.config.clone(),
                stop_rx,
            );
            WatcherHandle {
                stop: stop_tx,
                task: tokio::spawn(watcher.run()),
                generation,
            }
        })
    }

    /// Signal every watcher to stop and wait for the tasks to finish.
    pub async fn shutdown(&self) {
        let handles = self.registry.drain();
        let count = handles.len();

        for (_, handle) in &handles {
            let _ = handle.stop.send(true);
        }
        for (loan_id, handle) in handles {
            if let Err(e) = handle.task.await {
                warn!(loan_id = %loan_id, error = %e, "Watcher task panicked during shutdown");
            }
        }

        info!(watchers = count, "Supervisor shut down");
    }
}
