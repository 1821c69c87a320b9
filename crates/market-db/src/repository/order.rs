//! # Order Repository
//!
//! Persistence for the buy lifecycle. The status column only moves through
//! the conditional transitions below; there is no generic "set status".
//!
//! Authorization (who may complete, who may cancel) lives in market-core and
//! is enforced by the service layer before it calls in here - the repository
//! guards the state machine, not the caller.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use market_core::Order;

use crate::error::{DbError, DbResult};

const SELECT_ORDER: &str = "SELECT id, item_id, buyer_id, seller_id, amount_cents, status, \
     payment_session_id, created_at, updated_at, completed_at FROM orders";

/// Repository for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a freshly created order (built by `market_core::order::create_order`).
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(order_id = %order.id, item_id = %order.item_id, "Inserting order");

        sqlx::query(
            "INSERT INTO orders \
               (id, item_id, buyer_id, seller_id, amount_cents, status, \
                payment_session_id, created_at, updated_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&order.item_id)
        .bind(&order.buyer_id)
        .bind(&order.seller_id)
        .bind(order.amount_cents)
        .bind(order.status)
        .bind(&order.payment_session_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches an order by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!("{SELECT_ORDER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Fetches an order by ID, or returns NotFound.
    pub async fn require(&self, id: &str) -> DbResult<Order> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("order", id))
    }

    /// Lists orders where the user is buyer or seller, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{SELECT_ORDER} WHERE buyer_id = ?1 OR seller_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Records the checkout session opened for this order.
    pub async fn set_session(&self, id: &str, session_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET payment_session_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'created'",
        )
        .bind(session_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("order", id, "not awaiting payment"));
        }

        Ok(())
    }

    /// `created → paid`. Driven by payment reconciliation.
    pub async fn mark_paid(&self, id: &str, session_id: &str) -> DbResult<()> {
        debug!(order_id = %id, session_id = %session_id, "Marking order paid");

        let result = sqlx::query(
            "UPDATE orders SET status = 'paid', payment_session_id = ?, updated_at = ? \
             WHERE id = ? AND status = 'created'",
        )
        .bind(session_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("order", id, "cannot mark paid"));
        }

        Ok(())
    }

    /// `paid → completed`, stamping `completed_at`.
    pub async fn complete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE orders SET status = 'completed', completed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'paid'",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("order", id, "cannot complete"));
        }

        Ok(())
    }

    /// `created|paid → cancelled`.
    pub async fn cancel(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'cancelled', updated_at = ? \
             WHERE id = ? AND status IN ('created', 'paid')",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("order", id, "cannot cancel"));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
