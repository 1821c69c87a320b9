//! # Checkout Service
//!
//! Orchestrates money movement against the external processor.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(session_id) may be called any number of times, from any     │
//! │  number of concurrent callers (status polls, redirect landings).       │
//! │                                                                         │
//! │  1. Session already settled locally?  → return it, touch nothing       │
//! │  2. Ask the processor                                                   │
//! │  3. Processor says open?              → return, touch nothing          │
//! │  4. Processor says paid/expired       → conditional open→X on the      │
//! │     session row decides ONE winner; only the winner applies the        │
//! │     order/borrow/item/deposit effects                                  │
//! │                                                                         │
//! │  Result: effects apply exactly once no matter how reconciliation is    │
//! │  triggered or replayed.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts sent to the processor always come from the frozen transaction
//! rows, never from client input.

use std::sync::Arc;

use tracing::{info, warn};

use market_core::{
    Holder, HolderKind, ItemStatus, OrderStatus, PaymentSession, SessionStatus, DEFAULT_CURRENCY,
};
use market_db::Database;
use market_pay::{CheckoutProvider, SessionRequest};

use crate::error::{ApiError, ApiResult};

/// What a started checkout hands back to the client.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckoutStarted {
    pub session_id: String,
    /// The processor's hosted page; the client redirects the payer here.
    pub checkout_url: String,
    pub amount_cents: i64,
}

/// Checkout orchestration.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    provider: Arc<dyn CheckoutProvider>,
    success_url: String,
    cancel_url: String,
}

impl CheckoutService {
    pub fn new(
        db: Database,
        provider: Arc<dyn CheckoutProvider>,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        CheckoutService {
            db,
            provider,
            success_url,
            cancel_url,
        }
    }

    // =========================================================================
    // Starting checkout
    // =========================================================================

    /// Opens a checkout session for an order. Buyer-only, order must be
    /// awaiting payment. `origin` overrides the configured redirect base
    /// (the page the client wants the payer sent back to).
    pub async fn start_for_order(
        &self,
        user_id: &str,
        order_id: &str,
        origin: Option<&str>,
    ) -> ApiResult<CheckoutStarted> {
        let order = self.db.orders().require(order_id).await?;
        if order.buyer_id != user_id {
            return Err(ApiError::Forbidden(
                "only the buyer can pay for an order".to_string(),
            ));
        }
        if order.status != OrderStatus::Created {
            return Err(ApiError::Conflict(format!(
                "order {order_id} is not awaiting payment"
            )));
        }

        self.open_session(
            HolderKind::Order,
            order_id,
            order.amount_cents,
            format!("Campus Market purchase: order {order_id}"),
            origin,
        )
        .await
    }

    /// Opens a checkout session for an approved borrow. Borrower-only; the
    /// single charge is rental + deposit.
    pub async fn start_for_borrow(
        &self,
        user_id: &str,
        borrow_id: &str,
        origin: Option<&str>,
    ) -> ApiResult<CheckoutStarted> {
        let req = self.db.borrows().require(borrow_id).await?;
        if req.borrower_id != user_id {
            return Err(ApiError::Forbidden(
                "only the borrower can pay for a borrow".to_string(),
            ));
        }
        if req.status != market_core::BorrowStatus::Approved {
            return Err(ApiError::Conflict(format!(
                "borrow request {borrow_id} is not awaiting payment"
            )));
        }

        self.open_session(
            HolderKind::Borrow,
            borrow_id,
            req.total().cents(),
            format!("Campus Market borrow: {} day(s)", req.days),
            origin,
        )
        .await
    }

    /// Where the processor sends the payer afterwards. An origin from the
    /// request wins over the configured base so web and mobile clients can
    /// each land on their own pages.
    fn redirect_urls(&self, origin: Option<&str>) -> (String, String) {
        match origin {
            Some(origin) => {
                let origin = origin.trim_end_matches('/');
                (
                    format!("{origin}/payment-result?session_id={{CHECKOUT_SESSION_ID}}"),
                    format!("{origin}/payment-cancelled"),
                )
            }
            None => (self.success_url.clone(), self.cancel_url.clone()),
        }
    }

    async fn open_session(
        &self,
        kind: HolderKind,
        subject_id: &str,
        amount_cents: i64,
        description: String,
        origin: Option<&str>,
    ) -> ApiResult<CheckoutStarted> {
        let (success_url, cancel_url) = self.redirect_urls(origin);
        let created = self
            .provider
            .create_session(&SessionRequest {
                amount_cents,
                currency: DEFAULT_CURRENCY.to_string(),
                description,
                reference: subject_id.to_string(),
                success_url,
                cancel_url,
            })
            .await?;

        self.db
            .sessions()
            .insert(
                &created.id,
                kind,
                subject_id,
                amount_cents,
                DEFAULT_CURRENCY,
                &created.payload,
            )
            .await?;

        match kind {
            HolderKind::Order => self.db.orders().set_session(subject_id, &created.id).await?,
            HolderKind::Borrow => self.db.borrows().set_session(subject_id, &created.id).await?,
        }

        info!(session_id = %created.id, subject_id = %subject_id, amount_cents, "Checkout started");

        Ok(CheckoutStarted {
            session_id: created.id,
            checkout_url: created.url,
            amount_cents,
        })
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Reconciles a session against the processor and returns its current
    /// state. Safe to call any number of times.
    pub async fn reconcile(&self, session_id: &str) -> ApiResult<PaymentSession> {
        let session = self.db.sessions().require(session_id).await?;

        // Already settled locally: the stored answer is final
        if session.status != SessionStatus::Open {
            return Ok(session);
        }

        let snapshot = self.provider.session_status(session_id).await?;

        match snapshot.status {
            SessionStatus::Open => {}
            SessionStatus::Paid => {
                if self.db.sessions().settle(session_id, SessionStatus::Paid).await? {
                    self.apply_paid(&session).await?;
                }
            }
            SessionStatus::Expired => {
                if self
                    .db
                    .sessions()
                    .settle(session_id, SessionStatus::Expired)
                    .await?
                {
                    self.apply_expired(&session).await?;
                }
            }
        }

        Ok(self.db.sessions().require(session_id).await?)
    }

    /// First-application effects for a paid session.
    async fn apply_paid(&self, session: &PaymentSession) -> ApiResult<()> {
        match session.subject_kind {
            HolderKind::Order => {
                // Item stays reserved until the buyer confirms the handoff
                self.apply_logged(
                    self.db.orders().mark_paid(&session.subject_id, &session.id).await,
                    session,
                    "order paid",
                )?;
            }
            HolderKind::Borrow => {
                let req = self.db.borrows().require(&session.subject_id).await?;
                let holder = Holder::borrow(&req.id);

                // Activate is the gate for the whole borrow application: if
                // the request moved on (e.g. rejected while the session was
                // open), the item is no longer ours to finalize and no
                // deposit is held.
                let activated = self.apply_logged(
                    self.db.borrows().activate(&req.id, &session.id).await,
                    session,
                    "borrow activated",
                )?;
                if activated {
                    self.apply_logged(
                        self.db
                            .items()
                            .finalize(&req.item_id, &holder, ItemStatus::Rented)
                            .await,
                        session,
                        "item rented",
                    )?;
                    self.db.deposits().hold(&req.id, req.deposit_cents).await?;
                }
            }
        }

        info!(session_id = %session.id, subject_id = %session.subject_id, "Payment applied");
        Ok(())
    }

    /// First-application effects for an expired session: undo the hold.
    async fn apply_expired(&self, session: &PaymentSession) -> ApiResult<()> {
        match session.subject_kind {
            HolderKind::Order => {
                self.apply_logged(
                    self.db.orders().cancel(&session.subject_id).await,
                    session,
                    "order cancelled on expiry",
                )?;
                let order = self.db.orders().require(&session.subject_id).await?;
                self.db
                    .items()
                    .release(&order.item_id, &Holder::order(&order.id))
                    .await?;
            }
            HolderKind::Borrow => {
                self.apply_logged(
                    self.db
                        .borrows()
                        .reject(&session.subject_id, "payment session expired")
                        .await,
                    session,
                    "borrow rejected on expiry",
                )?;
                let req = self.db.borrows().require(&session.subject_id).await?;
                self.db
                    .items()
                    .release(&req.item_id, &Holder::borrow(&req.id))
                    .await?;
            }
        }

        info!(session_id = %session.id, subject_id = %session.subject_id, "Expiry applied");
        Ok(())
    }

    /// A subject transition can legitimately conflict even for the gate
    /// winner: the subject may have been cancelled or rejected while its
    /// session was still open at the processor. The session stays settled
    /// (it is the money record); the subject keeps its state, and we log
    /// the mismatch instead of failing the reconcile. Returns whether the
    /// transition actually applied so dependent effects can be skipped.
    fn apply_logged(
        &self,
        result: Result<(), market_db::DbError>,
        session: &PaymentSession,
        action: &str,
    ) -> ApiResult<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(err) if err.is_conflict() => {
                warn!(
                    session_id = %session.id,
                    subject_id = %session.subject_id,
                    action,
                    error = %err,
                    "Subject moved on before settlement; session recorded, subject unchanged"
                );
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::borrow::BorrowService;
    use crate::service::order::OrderService;
    use chrono::{Duration, Utc};
    use market_core::{BorrowStatus, DepositState, ItemCondition, ItemMode};
    use market_db::{DbConfig, NewItem};
    use market_pay::FakeCheckout;

    struct Harness {
        db: Database,
        fake: Arc<FakeCheckout>,
        checkout: CheckoutService,
        orders: OrderService,
        borrows: BorrowService,
    }

    async fn harness() -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fake = Arc::new(FakeCheckout::new());
        let checkout = CheckoutService::new(
            db.clone(),
            fake.clone(),
            "https://app.test/done".to_string(),
            "https://app.test/cancel".to_string(),
        );
        Harness {
            orders: OrderService::new(db.clone()),
            borrows: BorrowService::new(db.clone()),
            db,
            fake,
            checkout,
        }
    }

    async fn sale_item(db: &Database) -> String {
        db.items()
            .insert(NewItem {
                owner_id: "seller".to_string(),
                title: "Speaker".to_string(),
                description: String::new(),
                category: "electronics".to_string(),
                condition: ItemCondition::Good,
                mode: ItemMode::Buy,
                buy_price_cents: Some(4000),
                daily_price_cents: None,
                deposit_cents: None,
                images: vec![],
            })
            .await
            .unwrap()
            .id
    }

    async fn borrow_item(db: &Database) -> String {
        db.items()
            .insert(NewItem {
                owner_id: "lender".to_string(),
                title: "Drill".to_string(),
                description: String::new(),
                category: "tools".to_string(),
                condition: ItemCondition::Good,
                mode: ItemMode::Borrow,
                buy_price_cents: None,
                daily_price_cents: Some(1000),
                deposit_cents: Some(2000),
                images: vec![],
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_redirect_urls_origin_override() {
        let h = harness().await;

        let (success, cancel) = h.checkout.redirect_urls(None);
        assert_eq!(success, "https://app.test/done");
        assert_eq!(cancel, "https://app.test/cancel");

        let (success, cancel) = h.checkout.redirect_urls(Some("https://mobile.test/"));
        assert_eq!(
            success,
            "https://mobile.test/payment-result?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(cancel, "https://mobile.test/payment-cancelled");
    }

    #[tokio::test]
    async fn test_order_checkout_paid_flow() {
        let h = harness().await;
        let item_id = sale_item(&h.db).await;
        let order = h.orders.create("buyer", &item_id).await.unwrap();

        let started = h.checkout.start_for_order("buyer", &order.id, None).await.unwrap();
        assert_eq!(started.amount_cents, 4000);

        // Open session: reconcile is a no-op
        let open = h.checkout.reconcile(&started.session_id).await.unwrap();
        assert_eq!(open.status, SessionStatus::Open);

        h.fake.mark_paid(&started.session_id).await;
        let paid = h.checkout.reconcile(&started.session_id).await.unwrap();
        assert_eq!(paid.status, SessionStatus::Paid);

        let order = h.db.orders().require(&order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_session_id.as_deref(), Some(started.session_id.as_str()));

        // Item still reserved: handoff not confirmed yet
        assert_eq!(
            h.db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Reserved
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let h = harness().await;
        let item_id = sale_item(&h.db).await;
        let order = h.orders.create("buyer", &item_id).await.unwrap();
        let started = h.checkout.start_for_order("buyer", &order.id, None).await.unwrap();
        h.fake.mark_paid(&started.session_id).await;

        h.checkout.reconcile(&started.session_id).await.unwrap();
        // Replays: no error, no further effect
        h.checkout.reconcile(&started.session_id).await.unwrap();
        let third = h.checkout.reconcile(&started.session_id).await.unwrap();
        assert_eq!(third.status, SessionStatus::Paid);
        assert_eq!(
            h.db.orders().require(&order.id).await.unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_checkout_authz_and_state_guards() {
        let h = harness().await;
        let item_id = sale_item(&h.db).await;
        let order = h.orders.create("buyer", &item_id).await.unwrap();

        assert!(matches!(
            h.checkout.start_for_order("seller", &order.id, None).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        h.orders.cancel("buyer", &order.id).await.unwrap();
        assert!(matches!(
            h.checkout.start_for_order("buyer", &order.id, None).await.unwrap_err(),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_expired_order_session_releases_item() {
        let h = harness().await;
        let item_id = sale_item(&h.db).await;
        let order = h.orders.create("buyer", &item_id).await.unwrap();
        let started = h.checkout.start_for_order("buyer", &order.id, None).await.unwrap();

        h.fake.mark_expired(&started.session_id).await;
        let session = h.checkout.reconcile(&started.session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Expired);

        assert_eq!(
            h.db.orders().require(&order.id).await.unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(
            h.db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Available
        );
    }

    #[tokio::test]
    async fn test_borrow_checkout_paid_flow_holds_deposit() {
        let h = harness().await;
        let item_id = borrow_item(&h.db).await;
        let start = Utc::now();
        let req = h
            .borrows
            .create("borrower", &item_id, start, start + Duration::days(3))
            .await
            .unwrap();

        // Cannot pay before approval
        assert!(matches!(
            h.checkout.start_for_borrow("borrower", &req.id, None).await.unwrap_err(),
            ApiError::Conflict(_)
        ));

        h.borrows.approve("lender", &req.id).await.unwrap();
        let started = h.checkout.start_for_borrow("borrower", &req.id, None).await.unwrap();
        // 3 days × $10 + $20 deposit
        assert_eq!(started.amount_cents, 5000);

        h.fake.mark_paid(&started.session_id).await;
        h.checkout.reconcile(&started.session_id).await.unwrap();

        let active = h.db.borrows().require(&req.id).await.unwrap();
        assert_eq!(active.status, BorrowStatus::Active);
        assert_eq!(
            h.db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Rented
        );

        let deposit = h.db.deposits().require(&req.id).await.unwrap();
        assert_eq!(deposit.state, DepositState::Held);
        assert_eq!(deposit.amount_cents, 2000);
    }

    #[tokio::test]
    async fn test_expired_borrow_session_rejects_and_releases() {
        let h = harness().await;
        let item_id = borrow_item(&h.db).await;
        let start = Utc::now();
        let req = h
            .borrows
            .create("borrower", &item_id, start, start + Duration::days(2))
            .await
            .unwrap();
        h.borrows.approve("lender", &req.id).await.unwrap();
        let started = h.checkout.start_for_borrow("borrower", &req.id, None).await.unwrap();

        h.fake.mark_expired(&started.session_id).await;
        h.checkout.reconcile(&started.session_id).await.unwrap();

        let rejected = h.db.borrows().require(&req.id).await.unwrap();
        assert_eq!(rejected.status, BorrowStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("payment session expired")
        );
        assert_eq!(
            h.db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Available
        );
        // No deposit was ever held
        assert!(h.db.deposits().get(&req.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_borrow_cycle_releases_deposit_once() {
        let h = harness().await;
        let item_id = borrow_item(&h.db).await;
        let start = Utc::now();
        let req = h
            .borrows
            .create("borrower", &item_id, start, start + Duration::days(1))
            .await
            .unwrap();
        h.borrows.approve("lender", &req.id).await.unwrap();
        let started = h.checkout.start_for_borrow("borrower", &req.id, None).await.unwrap();
        h.fake.mark_paid(&started.session_id).await;
        h.checkout.reconcile(&started.session_id).await.unwrap();

        h.borrows.mark_returned("borrower", &req.id).await.unwrap();
        h.borrows.confirm_return("lender", &req.id).await.unwrap();

        let deposit = h.db.deposits().require(&req.id).await.unwrap();
        assert_eq!(deposit.state, DepositState::Released);

        // Confirming again is an invalid transition, and the ledger entry
        // cannot be released twice
        assert!(h.borrows.confirm_return("lender", &req.id).await.is_err());
        assert!(!h.db.deposits().release(&req.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_order_cancelled_while_session_open_keeps_money_record() {
        let h = harness().await;
        let item_id = sale_item(&h.db).await;
        let order = h.orders.create("buyer", &item_id).await.unwrap();
        let started = h.checkout.start_for_order("buyer", &order.id, None).await.unwrap();

        // Buyer cancels, then the stale session reports paid
        h.orders.cancel("buyer", &order.id).await.unwrap();
        h.fake.mark_paid(&started.session_id).await;

        let session = h.checkout.reconcile(&started.session_id).await.unwrap();
        // The money record is settled; the cancelled order is untouched
        assert_eq!(session.status, SessionStatus::Paid);
        assert_eq!(
            h.db.orders().require(&order.id).await.unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_borrow_rejected_while_session_open_keeps_money_record() {
        let h = harness().await;
        let item_id = borrow_item(&h.db).await;
        let start = Utc::now();
        let req = h
            .borrows
            .create("borrower", &item_id, start, start + Duration::days(2))
            .await
            .unwrap();
        h.borrows.approve("lender", &req.id).await.unwrap();
        let started = h.checkout.start_for_borrow("borrower", &req.id, None).await.unwrap();

        // Lender backs out after approving, then the stale session reports paid
        h.borrows.reject("lender", &req.id, "no longer lending").await.unwrap();
        h.fake.mark_paid(&started.session_id).await;

        let session = h.checkout.reconcile(&started.session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Paid);

        // The rejected request never activates, the item stays in the pool,
        // and no deposit is held
        assert_eq!(
            h.db.borrows().require(&req.id).await.unwrap().status,
            BorrowStatus::Rejected
        );
        assert_eq!(
            h.db.items().require(&item_id).await.unwrap().status,
            ItemStatus::Available
        );
        assert!(h.db.deposits().get(&req.id).await.unwrap().is_none());
    }
}
