//! # Borrow Request Repository
//!
//! Persistence for the borrow lifecycle. Six statuses, five conditional
//! transitions - each one a single UPDATE naming its expected prior status.
//! Per-step timestamps (`approved_at`, `returned_at`, `closed_at`) are
//! stamped by the transition that reaches them.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use market_core::BorrowRequest;

use crate::error::{DbError, DbResult};

const SELECT_BORROW: &str = "SELECT id, item_id, borrower_id, lender_id, start_date, end_date, days, \
     rental_cents, deposit_cents, status, rejection_reason, payment_session_id, \
     created_at, updated_at, approved_at, returned_at, closed_at FROM borrow_requests";

/// Repository for borrow requests.
#[derive(Debug, Clone)]
pub struct BorrowRepository {
    pool: SqlitePool,
}

impl BorrowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BorrowRepository { pool }
    }

    /// Inserts a freshly created request (built by `market_core::borrow::create_request`).
    pub async fn insert(&self, req: &BorrowRequest) -> DbResult<()> {
        debug!(borrow_id = %req.id, item_id = %req.item_id, "Inserting borrow request");

        sqlx::query(
            "INSERT INTO borrow_requests \
               (id, item_id, borrower_id, lender_id, start_date, end_date, days, \
                rental_cents, deposit_cents, status, rejection_reason, payment_session_id, \
                created_at, updated_at, approved_at, returned_at, closed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&req.id)
        .bind(&req.item_id)
        .bind(&req.borrower_id)
        .bind(&req.lender_id)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(req.days)
        .bind(req.rental_cents)
        .bind(req.deposit_cents)
        .bind(req.status)
        .bind(&req.rejection_reason)
        .bind(&req.payment_session_id)
        .bind(req.created_at)
        .bind(req.updated_at)
        .bind(req.approved_at)
        .bind(req.returned_at)
        .bind(req.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a request by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<BorrowRequest>> {
        let req = sqlx::query_as::<_, BorrowRequest>(&format!("{SELECT_BORROW} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(req)
    }

    /// Fetches a request by ID, or returns NotFound.
    pub async fn require(&self, id: &str) -> DbResult<BorrowRequest> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("borrow request", id))
    }

    /// Lists requests where the user is borrower or lender, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> DbResult<Vec<BorrowRequest>> {
        let reqs = sqlx::query_as::<_, BorrowRequest>(&format!(
            "{SELECT_BORROW} WHERE borrower_id = ?1 OR lender_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(reqs)
    }

    /// `requested → approved`, stamping `approved_at`.
    pub async fn approve(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE borrow_requests SET status = 'approved', approved_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'requested'",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("borrow request", id, "cannot approve"));
        }

        Ok(())
    }

    /// `requested|approved → rejected`, recording the reason. Used for both
    /// lender rejections and payment-expiry compensation.
    pub async fn reject(&self, id: &str, reason: &str) -> DbResult<()> {
        debug!(borrow_id = %id, reason = %reason, "Rejecting borrow request");

        let result = sqlx::query(
            "UPDATE borrow_requests SET status = 'rejected', rejection_reason = ?, updated_at = ? \
             WHERE id = ? AND status IN ('requested', 'approved')",
        )
        .bind(reason)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("borrow request", id, "cannot reject"));
        }

        Ok(())
    }

    /// Records the checkout session opened for this request.
    pub async fn set_session(&self, id: &str, session_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE borrow_requests SET payment_session_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'approved'",
        )
        .bind(session_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("borrow request", id, "not awaiting payment"));
        }

        Ok(())
    }

    /// `approved → active`. Driven by payment reconciliation.
    pub async fn activate(&self, id: &str, session_id: &str) -> DbResult<()> {
        debug!(borrow_id = %id, session_id = %session_id, "Activating borrow");

        let result = sqlx::query(
            "UPDATE borrow_requests SET status = 'active', payment_session_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'approved'",
        )
        .bind(session_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("borrow request", id, "cannot activate"));
        }

        Ok(())
    }

    /// `active → returned`, stamping `returned_at`.
    pub async fn mark_returned(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE borrow_requests SET status = 'returned', returned_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'active'",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("borrow request", id, "cannot mark returned"));
        }

        Ok(())
    }

    /// `returned → closed`, stamping `closed_at`.
    pub async fn close(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE borrow_requests SET status = 'closed', closed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'returned'",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("borrow request", id, "cannot close"));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
