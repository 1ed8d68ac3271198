//! Postgres-backed `LoanStore`.
//!
//! Loan ids are uint256 values stored as decimal strings; borrower addresses
//! are stored as hex strings. Rows that fail to parse back into those types
//! surface as `StoreError::Corrupt` rather than being silently dropped.

use alloy::primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use sentinel_core::{LoanStore, LoanWatchRecord, StoreError};

/// Postgres persistence for the loan watch table.
pub struct PgLoanStore {
    pool: PgPool,
}

impl PgLoanStore {
    /// Connect to Postgres and run pending migrations.
    /// Failure here is a fatal startup error.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Connected to Postgres loan store");

        Ok(Self { pool })
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<LoanWatchRecord, StoreError> {
        let loan_id_str: String = row.get("loan_id");
        let borrower_str: String = row.get("borrower");
        let active: bool = row.get("active");
        let created_at: DateTime<Utc> = row.get("created_at");
        let updated_at: DateTime<Utc> = row.get("updated_at");

        let loan_id: U256 = loan_id_str
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("bad loan_id: {loan_id_str}")))?;
        let borrower: Address = borrower_str
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("bad borrower: {borrower_str}")))?;

        Ok(LoanWatchRecord {
            loan_id,
            borrower,
            active,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl LoanStore for PgLoanStore {
    async fn active_loans(&self) -> Result<Vec<LoanWatchRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, borrower, active, created_at, updated_at
            FROM loan_watch
            WHERE active
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database)?;

        let records = rows
            .iter()
            .map(Self::record_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = records.len(), "Loaded active loan records");

        Ok(records)
    }

    async fn upsert_active(
        &self,
        loan_id: U256,
        borrower: Address,
    ) -> Result<LoanWatchRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO loan_watch (loan_id, borrower)
            VALUES ($1, $2)
            ON CONFLICT (loan_id) DO UPDATE SET
                borrower = EXCLUDED.borrower,
                active = TRUE,
                updated_at = NOW()
            RETURNING loan_id, borrower, active, created_at, updated_at
            "#,
        )
        .bind(loan_id.to_string())
        .bind(borrower.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::database)?;

        debug!(loan_id = %loan_id, borrower = %borrower, "Upserted loan watch record");

        Self::record_from_row(&row)
    }

    async fn deactivate(&self, loan_id: U256) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE loan_watch
            SET active = FALSE, updated_at = NOW()
            WHERE loan_id = $1 AND active
            "#,
        )
        .bind(loan_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;

        debug!(
            loan_id = %loan_id,
            updated = result.rows_affected(),
            "Deactivated loan watch record"
        );

        Ok(())
    }
}
