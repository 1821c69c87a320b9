//! # Borrow Service
//!
//! The borrow lifecycle. The item is held from the moment a request is
//! created, which is what makes "one active request per item" a reservation
//! race instead of a table scan:
//!
//! ```text
//! request:        build request (rules) ──► reserve item ──► insert request
//! approve:        requested → approved          (item stays reserved)
//! reject:         → rejected, item released
//! [payment]:      approved → active, item reserved → rented, deposit held
//! return:         active → returned              (item stays rented)
//! confirm return: returned → closed, item released, deposit released
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use market_core::{borrow as borrow_rules, BorrowRequest, Holder};
use market_db::Database;

use crate::error::ApiResult;

/// Borrow lifecycle operations.
#[derive(Clone)]
pub struct BorrowService {
    db: Database,
}

impl BorrowService {
    pub fn new(db: Database) -> Self {
        BorrowService { db }
    }

    /// Creates a borrow request for a date range, freezing the quote and
    /// reserving the item. Same compensation shape as order creation.
    pub async fn create(
        &self,
        borrower_id: &str,
        item_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<BorrowRequest> {
        let item = self.db.items().require(item_id).await?;
        let req = borrow_rules::create_request(&item, borrower_id, start, end, Utc::now())?;
        let holder = Holder::borrow(&req.id);

        self.db.items().reserve(item_id, &holder).await?;

        if let Err(err) = self.db.borrows().insert(&req).await {
            if let Err(release_err) = self.db.items().release(item_id, &holder).await {
                warn!(item_id = %item_id, error = %release_err, "Failed to release after insert failure");
            }
            return Err(err.into());
        }

        info!(
            borrow_id = %req.id,
            item_id = %item_id,
            days = req.days,
            total_cents = req.total().cents(),
            "Borrow requested"
        );
        Ok(req)
    }

    /// Fetches a request. Participants only.
    pub async fn get(&self, user_id: &str, id: &str) -> ApiResult<BorrowRequest> {
        let req = self.db.borrows().require(id).await?;
        if req.borrower_id != user_id && req.lender_id != user_id {
            return Err(market_core::CoreError::Forbidden("not a party to this request").into());
        }
        Ok(req)
    }

    /// Lists the caller's requests (as borrower or lender), newest first.
    pub async fn list(&self, user_id: &str, limit: i64) -> ApiResult<Vec<BorrowRequest>> {
        Ok(self.db.borrows().list_for_user(user_id, limit).await?)
    }

    /// Lender approves: `requested → approved`. The item stays reserved;
    /// payment is what activates the rental.
    pub async fn approve(&self, user_id: &str, id: &str) -> ApiResult<BorrowRequest> {
        let req = self.db.borrows().require(id).await?;

        let mut checked = req.clone();
        borrow_rules::approve(&mut checked, user_id, Utc::now())?;

        self.db.borrows().approve(id).await?;
        info!(borrow_id = %id, "Borrow approved");
        Ok(self.db.borrows().require(id).await?)
    }

    /// Lender rejects: `requested|approved → rejected`, item released.
    pub async fn reject(&self, user_id: &str, id: &str, reason: &str) -> ApiResult<BorrowRequest> {
        let req = self.db.borrows().require(id).await?;

        let mut checked = req.clone();
        borrow_rules::reject(&mut checked, user_id, reason, Utc::now())?;

        self.db.borrows().reject(id, reason).await?;
        self.db
            .items()
            .release(&req.item_id, &Holder::borrow(id))
            .await?;

        info!(borrow_id = %id, "Borrow rejected, item released");
        Ok(self.db.borrows().require(id).await?)
    }

    /// Borrower hands the item back: `active → returned`. The item stays
    /// `rented` until the lender confirms - the claim is still open.
    pub async fn mark_returned(&self, user_id: &str, id: &str) -> ApiResult<BorrowRequest> {
        let req = self.db.borrows().require(id).await?;

        let mut checked = req.clone();
        borrow_rules::mark_returned(&mut checked, user_id, Utc::now())?;

        self.db.borrows().mark_returned(id).await?;
        info!(borrow_id = %id, "Item marked returned");
        Ok(self.db.borrows().require(id).await?)
    }

    /// Lender confirms the return: `returned → closed`, item released back
    /// to `available`, deposit released to the borrower.
    pub async fn confirm_return(&self, user_id: &str, id: &str) -> ApiResult<BorrowRequest> {
        let req = self.db.borrows().require(id).await?;

        let mut checked = req.clone();
        borrow_rules::confirm_return(&mut checked, user_id, Utc::now())?;

        self.db.borrows().close(id).await?;
        self.db
            .items()
            .release(&req.item_id, &Holder::borrow(id))
            .await?;
        let released = self.db.deposits().release(id).await?;

        info!(borrow_id = %id, deposit_released = released, "Borrow closed");
        Ok(self.db.borrows().require(id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use chrono::Duration;
    use market_core::{BorrowStatus, DepositState, ItemCondition, ItemMode, ItemStatus};
    use market_db::{DbConfig, NewItem};

    async fn seeded() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .items()
            .insert(NewItem {
                owner_id: "lender".to_string(),
                title: "Kayak".to_string(),
                description: String::new(),
                category: "outdoors".to_string(),
                condition: ItemCondition::Good,
                mode: ItemMode::Borrow,
                buy_price_cents: None,
                daily_price_cents: Some(1500),
                deposit_cents: Some(5000),
                images: vec![],
            })
            .await
            .unwrap();
        (db, item.id)
    }

    fn window(days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now();
        (start, start + Duration::days(days))
    }

    #[tokio::test]
    async fn test_request_reserves_item_and_freezes_quote() {
        let (db, item_id) = seeded().await;
        let svc = BorrowService::new(db.clone());
        let (start, end) = window(4);

        let req = svc.create("borrower", &item_id, start, end).await.unwrap();
        assert_eq!(req.status, BorrowStatus::Requested);
        assert_eq!(req.rental_cents, 6000);
        assert_eq!(req.deposit_cents, 5000);

        let item = db.items().require(&item_id).await.unwrap();
        assert_eq!(item.status, ItemStatus::Reserved);
        assert_eq!(item.holder, Some(Holder::borrow(&req.id)));
    }

    #[tokio::test]
    async fn test_second_request_conflicts_until_rejection_frees_item() {
        let (db, item_id) = seeded().await;
        let svc = BorrowService::new(db);
        let (start, end) = window(2);

        let first = svc.create("borrower-a", &item_id, start, end).await.unwrap();
        let err = svc.create("borrower-b", &item_id, start, end).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        svc.reject("lender", &first.id, "sorry").await.unwrap();

        // Rejection released the item; the second borrower can try again
        svc.create("borrower-b", &item_id, start, end).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_is_lender_only_and_keeps_reservation() {
        let (db, item_id) = seeded().await;
        let svc = BorrowService::new(db.clone());
        let (start, end) = window(2);
        let req = svc.create("borrower", &item_id, start, end).await.unwrap();

        assert!(matches!(
            svc.approve("borrower", &req.id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        let approved = svc.approve("lender", &req.id).await.unwrap();
        assert_eq!(approved.status, BorrowStatus::Approved);
        assert_eq!(
            db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Reserved
        );
    }

    #[tokio::test]
    async fn test_full_cycle_releases_item_and_deposit() {
        let (db, item_id) = seeded().await;
        let svc = BorrowService::new(db.clone());
        let (start, end) = window(2);
        let req = svc.create("borrower", &item_id, start, end).await.unwrap();

        svc.approve("lender", &req.id).await.unwrap();

        // Payment settles out-of-band (checkout service); simulate its effects
        db.borrows().activate(&req.id, "cs_1").await.unwrap();
        db.items()
            .finalize(&item_id, &Holder::borrow(&req.id), ItemStatus::Rented)
            .await
            .unwrap();
        db.deposits().hold(&req.id, req.deposit_cents).await.unwrap();

        let returned = svc.mark_returned("borrower", &req.id).await.unwrap();
        assert_eq!(returned.status, BorrowStatus::Returned);
        // Lender hasn't confirmed; the item is still claimed
        assert_eq!(
            db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Rented
        );

        let closed = svc.confirm_return("lender", &req.id).await.unwrap();
        assert_eq!(closed.status, BorrowStatus::Closed);
        assert_eq!(
            db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Available
        );
        assert_eq!(
            db.deposits().require(&req.id).await.unwrap().state,
            DepositState::Released
        );
    }

    #[tokio::test]
    async fn test_return_before_activation_is_rejected() {
        let (db, item_id) = seeded().await;
        let svc = BorrowService::new(db);
        let (start, end) = window(2);
        let req = svc.create("borrower", &item_id, start, end).await.unwrap();

        svc.approve("lender", &req.id).await.unwrap();
        let err = svc.mark_returned("borrower", &req.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_self_borrow_rejected_without_reserving() {
        let (db, item_id) = seeded().await;
        let svc = BorrowService::new(db.clone());
        let (start, end) = window(2);

        let err = svc.create("lender", &item_id, start, end).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(
            db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Available
        );
    }
}
