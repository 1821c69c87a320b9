//! # Order State Machine
//!
//! Pure transition logic for the buy lifecycle. The storage layer re-checks
//! every transition with a conditional UPDATE, but the rules live here where
//! they can be tested without a database.
//!
//! ## The Lifecycle
//! ```text
//!                    ┌──────── payment confirmed ────────┐
//!                    │                                    ▼
//!  create ──► [created] ──cancel──► [cancelled]       [paid] ──complete──► [completed]
//!                                    (terminal)          │                  (terminal)
//!                                        ▲               │
//!                                        └────cancel─────┘
//! ```
//!
//! Completion marks the item `sold`; cancellation releases it back to
//! `available`. Both are handled by the caller against the catalog - this
//! module only rules on the order record itself.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Item, Order, OrderStatus};

// =============================================================================
// Creation
// =============================================================================

/// Builds a new order for `item`, freezing the buy price.
///
/// ## Rules
/// - The item's mode must allow buying and its status must be `available`
///   (the catalog reservation is the authoritative race guard; this check
///   gives a clean error on the fast path)
/// - The buyer must not be the owner
/// - `amount_cents` snapshots the buy price; later re-pricing never changes it
pub fn create_order(item: &Item, buyer_id: &str, now: DateTime<Utc>) -> CoreResult<Order> {
    if item.owner_id == buyer_id {
        return Err(CoreError::SelfTrade);
    }
    if !item.can_buy() {
        return Err(CoreError::not_for_sale(&item.id));
    }
    let amount_cents = item
        .buy_price_cents
        .ok_or_else(|| CoreError::not_for_sale(&item.id))?;

    Ok(Order {
        id: Uuid::new_v4().to_string(),
        item_id: item.id.clone(),
        buyer_id: buyer_id.to_string(),
        seller_id: item.owner_id.clone(),
        amount_cents,
        status: OrderStatus::Created,
        payment_session_id: None,
        created_at: now,
        updated_at: now,
        completed_at: None,
    })
}

// =============================================================================
// Transitions
// =============================================================================

/// `created → paid`, driven by payment reconciliation. Records the session
/// that settled the charge.
pub fn mark_paid(order: &mut Order, session_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if order.status != OrderStatus::Created {
        return Err(CoreError::order_transition(order.status, "mark paid"));
    }
    order.status = OrderStatus::Paid;
    order.payment_session_id = Some(session_id.to_string());
    order.updated_at = now;
    Ok(())
}

/// `paid → completed`. Buyer-only: completion is the buyer's confirmation
/// that the handoff happened.
pub fn complete(order: &mut Order, acting_user: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if order.buyer_id != acting_user {
        return Err(CoreError::Forbidden("only the buyer can complete an order"));
    }
    if order.status != OrderStatus::Paid {
        return Err(CoreError::order_transition(order.status, "complete"));
    }
    order.status = OrderStatus::Completed;
    order.completed_at = Some(now);
    order.updated_at = now;
    Ok(())
}

/// `created|paid → cancelled`. Buyer or seller may cancel before completion.
pub fn cancel(order: &mut Order, acting_user: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if order.buyer_id != acting_user && order.seller_id != acting_user {
        return Err(CoreError::Forbidden(
            "only the buyer or seller can cancel an order",
        ));
    }
    match order.status {
        OrderStatus::Created | OrderStatus::Paid => {
            order.status = OrderStatus::Cancelled;
            order.updated_at = now;
            Ok(())
        }
        _ => Err(CoreError::order_transition(order.status, "cancel")),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
