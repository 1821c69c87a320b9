//! # Deposit Ledger Repository
//!
//! Holds and releases borrow deposits with at-most-once semantics on both
//! sides: the primary key (`borrow_id`) makes a double hold a unique
//! violation, and release is a conditional `held → released` update.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use market_core::DepositEntry;

use crate::error::{DbError, DbResult};

const SELECT_DEPOSIT: &str =
    "SELECT borrow_id, amount_cents, state, held_at, released_at FROM deposit_ledger";

/// Repository for the deposit ledger.
#[derive(Debug, Clone)]
pub struct DepositRepository {
    pool: SqlitePool,
}

impl DepositRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DepositRepository { pool }
    }

    /// Records a held deposit for a borrow. At most one entry per borrow;
    /// a second hold hits the primary key.
    pub async fn hold(&self, borrow_id: &str, amount_cents: i64) -> DbResult<DepositEntry> {
        debug!(borrow_id = %borrow_id, amount_cents, "Holding deposit");

        sqlx::query(
            "INSERT INTO deposit_ledger (borrow_id, amount_cents, state, held_at) \
             VALUES (?, ?, 'held', ?)",
        )
        .bind(borrow_id)
        .bind(amount_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.require(borrow_id).await
    }

    /// Fetches the ledger entry for a borrow.
    pub async fn get(&self, borrow_id: &str) -> DbResult<Option<DepositEntry>> {
        let entry =
            sqlx::query_as::<_, DepositEntry>(&format!("{SELECT_DEPOSIT} WHERE borrow_id = ?"))
                .bind(borrow_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(entry)
    }

    /// Fetches the ledger entry for a borrow, or returns NotFound.
    pub async fn require(&self, borrow_id: &str) -> DbResult<DepositEntry> {
        self.get(borrow_id)
            .await?
            .ok_or_else(|| DbError::not_found("deposit", borrow_id))
    }

    /// `held → released`, stamping `released_at`. Returns `true` iff this
    /// call did the release; a replay returns `false` with no error.
    pub async fn release(&self, borrow_id: &str) -> DbResult<bool> {
        debug!(borrow_id = %borrow_id, "Releasing deposit");

        let result = sqlx::query(
            "UPDATE deposit_ledger SET state = 'released', released_at = ? \
             WHERE borrow_id = ? AND state = 'held'",
        )
        .bind(Utc::now())
        .bind(borrow_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
