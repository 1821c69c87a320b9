//! # Payment Session Repository
//!
//! The audit trail of money movement, and the idempotency gate for
//! reconciliation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FIRST-APPLICATION GATE                                                 │
//! │                                                                         │
//! │  settle:  UPDATE payment_sessions SET status = 'paid'                  │
//! │           WHERE id = ? AND status = 'open'                             │
//! │                                                                         │
//! │  Reconciliation may be driven by a status poll, a redirect landing,    │
//! │  or both at once. Whoever wins this UPDATE applies the order/borrow    │
//! │  effect; everyone else observes rows_affected == 0 and applies         │
//! │  NOTHING. Same shape for 'expired'.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use market_core::{HolderKind, PaymentSession, SessionStatus};

use crate::error::{DbError, DbResult};

const SELECT_SESSION: &str = "SELECT id, subject_kind, subject_id, amount_cents, currency, status, \
     provider_payload, created_at, updated_at FROM payment_sessions";

/// Repository for payment sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a session returned by the provider, status `open`.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        id: &str,
        subject_kind: HolderKind,
        subject_id: &str,
        amount_cents: i64,
        currency: &str,
        provider_payload: &str,
    ) -> DbResult<PaymentSession> {
        let now = Utc::now();

        debug!(session_id = %id, subject_id = %subject_id, amount_cents, "Recording payment session");

        sqlx::query(
            "INSERT INTO payment_sessions \
               (id, subject_kind, subject_id, amount_cents, currency, status, \
                provider_payload, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'open', ?, ?, ?)",
        )
        .bind(id)
        .bind(subject_kind)
        .bind(subject_id)
        .bind(amount_cents)
        .bind(currency)
        .bind(provider_payload)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require(id).await
    }

    /// Fetches a session by its external ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<PaymentSession>> {
        let session =
            sqlx::query_as::<_, PaymentSession>(&format!("{SELECT_SESSION} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(session)
    }

    /// Fetches a session by its external ID, or returns NotFound.
    pub async fn require(&self, id: &str) -> DbResult<PaymentSession> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("payment session", id))
    }

    /// `open → paid|expired`, the first-application gate.
    ///
    /// Returns `true` iff this call won the transition - the caller that
    /// sees `true` (and only that caller) applies the subject effect.
    /// A replay or a lost race returns `false` with no error: observing an
    /// already-settled session is normal, not exceptional.
    pub async fn settle(&self, id: &str, to: SessionStatus) -> DbResult<bool> {
        debug!(session_id = %id, to = ?to, "Settling payment session");

        let result = sqlx::query(
            "UPDATE payment_sessions SET status = ?, updated_at = ? \
             WHERE id = ? AND status = 'open'",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
