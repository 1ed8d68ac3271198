//! In-memory client doubles shared by the engine tests.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::clients::{ChainClient, LoanStore, PriceOracle};
use crate::error::{ChainError, OracleError, StoreError};
use crate::types::{LiquidationReceipt, LoanSnapshot, LoanWatchRecord, PriceQuote};

pub const COLLATERAL_FEED: B256 = B256::repeat_byte(0xAA);
pub const PRINCIPAL_FEED: B256 = B256::repeat_byte(0xBB);

struct MockLoan {
    snapshot: LoanSnapshot,
    active: bool,
}

/// Scriptable chain double tracking call counts.
#[derive(Default)]
pub struct MockChain {
    loans: Mutex<HashMap<U256, MockLoan>>,
    pub get_loan_calls: AtomicUsize,
    pub liquidate_calls: AtomicUsize,
    fail_liquidations: AtomicUsize,
    fail_reads: AtomicBool,
    hang_reads: AtomicBool,
    hang_submissions: AtomicBool,
}

impl MockChain {
    pub fn insert_loan(&self, loan_id: U256, collateral_amount: f64, total_owed: f64) {
        self.loans.lock().unwrap().insert(
            loan_id,
            MockLoan {
                snapshot: LoanSnapshot {
                    collateral_amount,
                    total_owed,
                    collateral_feed: COLLATERAL_FEED,
                    principal_feed: PRINCIPAL_FEED,
                },
                active: true,
            },
        );
    }

    /// Mark a loan resolved, as if another actor liquidated or repaid it.
    pub fn resolve_loan(&self, loan_id: U256) {
        if let Some(loan) = self.loans.lock().unwrap().get_mut(&loan_id) {
            loan.active = false;
            loan.snapshot.total_owed = 0.0;
        }
    }

    pub fn set_total_owed(&self, loan_id: U256, total_owed: f64) {
        if let Some(loan) = self.loans.lock().unwrap().get_mut(&loan_id) {
            loan.snapshot.total_owed = total_owed;
        }
    }

    pub fn loan_active(&self, loan_id: U256) -> bool {
        self.loans
            .lock()
            .unwrap()
            .get(&loan_id)
            .map(|l| l.active)
            .unwrap_or(false)
    }

    /// Make the next `n` liquidation submissions revert.
    pub fn fail_next_liquidations(&self, n: usize) {
        self.fail_liquidations.store(n, Ordering::SeqCst);
    }

    /// Toggle transient read failures (get_loan / is_loan_active).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make reads hang forever, simulating a stalled RPC endpoint.
    pub fn set_hang_reads(&self, hang: bool) {
        self.hang_reads.store(hang, Ordering::SeqCst);
    }

    /// Make liquidation submissions hang forever.
    pub fn set_hang_submissions(&self, hang: bool) {
        self.hang_submissions.store(hang, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_loan(&self, loan_id: U256) -> Result<LoanSnapshot, ChainError> {
        self.get_loan_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("simulated rpc outage".into()));
        }
        self.loans
            .lock()
            .unwrap()
            .get(&loan_id)
            .map(|l| l.snapshot.clone())
            .ok_or(ChainError::LoanNotFound(loan_id))
    }

    async fn is_loan_active(&self, loan_id: U256) -> Result<bool, ChainError> {
        if self.hang_reads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("simulated rpc outage".into()));
        }
        Ok(self.loan_active(loan_id))
    }

    async fn liquidate_loan(
        &self,
        loan_id: U256,
        _owner_account: Address,
    ) -> Result<LiquidationReceipt, ChainError> {
        if self.hang_submissions.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self
            .fail_liquidations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ChainError::Reverted(B256::repeat_byte(0xFF)));
        }
        self.liquidate_calls.fetch_add(1, Ordering::SeqCst);
        let mut loans = self.loans.lock().unwrap();
        let loan = loans
            .get_mut(&loan_id)
            .ok_or(ChainError::LoanNotFound(loan_id))?;
        loan.active = false;
        loan.snapshot.total_owed = 0.0;
        Ok(LiquidationReceipt {
            tx_hash: B256::repeat_byte(0x11),
            block_number: 100,
            gas_used: 210_000,
        })
    }
}

/// Scriptable oracle double.
#[derive(Default)]
pub struct MockOracle {
    quotes: Mutex<HashMap<B256, PriceQuote>>,
}

impl MockOracle {
    pub fn set_price(&self, feed_id: B256, price: f64) {
        self.set_quote(feed_id, price, Duration::ZERO);
    }

    pub fn set_quote(&self, feed_id: B256, price: f64, age: Duration) {
        self.quotes.lock().unwrap().insert(
            feed_id,
            PriceQuote {
                feed_id,
                price,
                age,
            },
        );
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn get_price(&self, feed_id: B256) -> Result<PriceQuote, OracleError> {
        self.quotes
            .lock()
            .unwrap()
            .get(&feed_id)
            .cloned()
            .ok_or(OracleError::Unavailable {
                feed_id,
                reason: "no quote configured".into(),
            })
    }
}

/// In-memory loan store.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<U256, LoanWatchRecord>>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn record(&self, loan_id: U256) -> Option<LoanWatchRecord> {
        self.records.lock().unwrap().get(&loan_id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.active)
            .count()
    }

    /// Make `active_loans` fail, simulating an unreachable database.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn active_loans(&self) -> Result<Vec<LoanWatchRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("simulated database outage".into()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }

    async fn upsert_active(
        &self,
        loan_id: U256,
        borrower: Address,
    ) -> Result<LoanWatchRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = records
            .entry(loan_id)
            .and_modify(|r| {
                r.active = true;
                r.updated_at = now;
            })
            .or_insert(LoanWatchRecord {
                loan_id,
                borrower,
                active: true,
                created_at: now,
                updated_at: now,
            });
        Ok(record.clone())
    }

    async fn deactivate(&self, loan_id: U256) -> Result<(), StoreError> {
        if let Some(record) = self.records.lock().unwrap().get_mut(&loan_id) {
            if record.active {
                record.active = false;
                record.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}
