//! # Order Service
//!
//! The buy lifecycle: reserve-then-insert at creation, settle or release at
//! the end.
//!
//! ```text
//! create:    build order (rules) ──► reserve item (CAS) ──► insert order
//!                                        │ insert fails?
//!                                        ▼
//!                                   release item (compensation)
//!
//! complete:  order paid → completed, item reserved → sold
//! cancel:    order → cancelled, item released (if this order held it)
//! ```

use chrono::Utc;
use tracing::{info, warn};

use market_core::{order as order_rules, Holder, ItemStatus, Order};
use market_db::Database;

use crate::error::ApiResult;

/// Order lifecycle operations.
#[derive(Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// Creates an order for `item_id` and reserves the item.
    ///
    /// The reservation is the race arbiter: of N concurrent buyers, exactly
    /// one passes the conditional UPDATE. If the order insert then fails,
    /// the reservation is released so the item is not stranded.
    pub async fn create(&self, buyer_id: &str, item_id: &str) -> ApiResult<Order> {
        let item = self.db.items().require(item_id).await?;
        let order = order_rules::create_order(&item, buyer_id, Utc::now())?;
        let holder = Holder::order(&order.id);

        self.db.items().reserve(item_id, &holder).await?;

        if let Err(err) = self.db.orders().insert(&order).await {
            // Compensate: don't strand the reservation
            if let Err(release_err) = self.db.items().release(item_id, &holder).await {
                warn!(item_id = %item_id, error = %release_err, "Failed to release after insert failure");
            }
            return Err(err.into());
        }

        info!(order_id = %order.id, item_id = %item_id, buyer_id = %buyer_id, "Order created");
        Ok(order)
    }

    /// Fetches an order. Participants only.
    pub async fn get(&self, user_id: &str, id: &str) -> ApiResult<Order> {
        let order = self.db.orders().require(id).await?;
        if order.buyer_id != user_id && order.seller_id != user_id {
            return Err(market_core::CoreError::Forbidden("not a party to this order").into());
        }
        Ok(order)
    }

    /// Lists the caller's orders (as buyer or seller), newest first.
    pub async fn list(&self, user_id: &str, limit: i64) -> ApiResult<Vec<Order>> {
        Ok(self.db.orders().list_for_user(user_id, limit).await?)
    }

    /// Buyer confirms the handoff: order `paid → completed`, item
    /// `reserved → sold`.
    pub async fn complete(&self, user_id: &str, id: &str) -> ApiResult<Order> {
        let order = self.db.orders().require(id).await?;

        // Rules first (authorization + transition), storage re-checks under
        // concurrency
        let mut checked = order.clone();
        order_rules::complete(&mut checked, user_id, Utc::now())?;

        self.db.orders().complete(id).await?;
        self.db
            .items()
            .finalize(&order.item_id, &Holder::order(id), ItemStatus::Sold)
            .await?;

        info!(order_id = %id, "Order completed, item sold");
        Ok(self.db.orders().require(id).await?)
    }

    /// Buyer or seller cancels before completion. Releases the item if this
    /// order still holds it.
    pub async fn cancel(&self, user_id: &str, id: &str) -> ApiResult<Order> {
        let order = self.db.orders().require(id).await?;

        let mut checked = order.clone();
        order_rules::cancel(&mut checked, user_id, Utc::now())?;

        self.db.orders().cancel(id).await?;
        self.db
            .items()
            .release(&order.item_id, &Holder::order(id))
            .await?;

        info!(order_id = %id, "Order cancelled, item released");
        Ok(self.db.orders().require(id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use market_core::{ItemCondition, ItemMode, OrderStatus};
    use market_db::{DbConfig, NewItem};

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .items()
            .insert(NewItem {
                owner_id: "seller".to_string(),
                title: "Monitor".to_string(),
                description: String::new(),
                category: "electronics".to_string(),
                condition: ItemCondition::Good,
                mode: ItemMode::Buy,
                buy_price_cents: Some(8000),
                daily_price_cents: None,
                deposit_cents: None,
                images: vec![],
            })
            .await
            .unwrap();
        (db, item.id)
    }

    #[tokio::test]
    async fn test_create_reserves_item() {
        let (db, item_id) = seeded().await;
        let svc = OrderService::new(db.clone());

        let order = svc.create("buyer", &item_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.amount_cents, 8000);

        let item = db.items().require(&item_id).await.unwrap();
        assert_eq!(item.status, ItemStatus::Reserved);
        assert_eq!(item.holder, Some(Holder::order(&order.id)));
    }

    #[tokio::test]
    async fn test_two_buyers_one_wins() {
        let (db, item_id) = seeded().await;
        let svc = OrderService::new(db);

        let (a, b) = tokio::join!(svc.create("buyer-a", &item_id), svc.create("buyer-b", &item_id));

        // Exactly one create succeeds; the loser sees a conflict
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser.unwrap_err(), ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_owner_cannot_buy_own_item() {
        let (db, item_id) = seeded().await;
        let svc = OrderService::new(db.clone());

        let err = svc.create("seller", &item_id).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        // Nothing was reserved
        assert_eq!(
            db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Available
        );
    }

    #[tokio::test]
    async fn test_complete_sells_the_item() {
        let (db, item_id) = seeded().await;
        let svc = OrderService::new(db.clone());

        let order = svc.create("buyer", &item_id).await.unwrap();
        db.orders().mark_paid(&order.id, "cs_1").await.unwrap();

        // Seller cannot complete
        assert!(matches!(
            svc.complete("seller", &order.id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        let done = svc.complete("buyer", &order.id).await.unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
        assert_eq!(
            db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Sold
        );
    }

    #[tokio::test]
    async fn test_cancel_releases_item() {
        let (db, item_id) = seeded().await;
        let svc = OrderService::new(db.clone());

        let order = svc.create("buyer", &item_id).await.unwrap();
        let cancelled = svc.cancel("seller", &order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let item = db.items().require(&item_id).await.unwrap();
        assert_eq!(item.status, ItemStatus::Available);
        assert!(item.holder.is_none());

        // Item is immediately buyable again
        svc.create("buyer-2", &item_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_is_participant_only() {
        let (db, item_id) = seeded().await;
        let svc = OrderService::new(db);

        let order = svc.create("buyer", &item_id).await.unwrap();
        assert!(svc.get("buyer", &order.id).await.is_ok());
        assert!(svc.get("seller", &order.id).await.is_ok());
        assert!(matches!(
            svc.get("stranger", &order.id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }
}
