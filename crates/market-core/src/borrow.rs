//! # Borrow State Machine & Quote Math
//!
//! Pure transition logic for the borrow lifecycle and the rental quote
//! computation that freezes prices at request time.
//!
//! ## The Lifecycle
//! ```text
//!  request ──► [requested] ──approve──► [approved] ──payment──► [active]
//!                   │                        │                      │
//!                 reject                reject / expire          return
//!                   ▼                        ▼                      ▼
//!              [rejected]               [rejected]             [returned]
//!              (terminal)               (terminal)                  │
//!                                                           confirm return
//!                                                                  ▼
//!                                                              [closed]
//!                                                             (terminal)
//! ```
//!
//! The lender decides approve/reject; the borrower pays and returns; the
//! lender confirms the return, which releases the deposit. The item is held
//! (reserved) from request time until a terminal state releases it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BorrowRequest, BorrowStatus, Item};
use crate::MAX_BORROW_DAYS;

const SECS_PER_DAY: i64 = 86_400;

// =============================================================================
// Quote
// =============================================================================

/// A priced borrow window, computed once and frozen onto the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowQuote {
    /// Whole days charged, minimum 1. Partial days round up.
    pub days: i64,
    /// days × daily price.
    pub rental: Money,
    /// The listing's deposit (zero when it carries none).
    pub deposit: Money,
}

impl BorrowQuote {
    /// Prices a window against an item.
    ///
    /// ## Rules
    /// - `end` must be strictly after `start`
    /// - Partial days round **up**: a 36-hour window charges 2 days
    /// - The window may not exceed [`MAX_BORROW_DAYS`]
    pub fn compute(item: &Item, start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if end <= start {
            return Err(CoreError::InvalidRange(
                "end date must be after start date".to_string(),
            ));
        }
        let secs = (end - start).num_seconds();
        let days = ((secs + SECS_PER_DAY - 1) / SECS_PER_DAY).max(1);
        if days > MAX_BORROW_DAYS {
            return Err(CoreError::InvalidRange(format!(
                "window of {days} days exceeds the {MAX_BORROW_DAYS}-day maximum"
            )));
        }
        let daily = item
            .daily_price()
            .ok_or_else(|| CoreError::not_for_borrow(&item.id))?;

        Ok(BorrowQuote {
            days,
            rental: daily.multiply_days(days),
            deposit: item.deposit(),
        })
    }

    /// The single charge collected at checkout.
    #[inline]
    pub fn total(&self) -> Money {
        self.rental + self.deposit
    }
}

// =============================================================================
// Creation
// =============================================================================

/// Builds a new borrow request for `item`, freezing the quote.
///
/// The catalog reservation (taken by the caller) is the authoritative race
/// guard; the availability check here gives a clean error on the fast path.
pub fn create_request(
    item: &Item,
    borrower_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<BorrowRequest> {
    if item.owner_id == borrower_id {
        return Err(CoreError::SelfBorrow);
    }
    if !item.can_borrow() {
        return Err(CoreError::not_for_borrow(&item.id));
    }
    // Day granularity: starting later today is fine, yesterday is not
    if start.date_naive() < now.date_naive() {
        return Err(CoreError::InvalidRange(
            "start date is in the past".to_string(),
        ));
    }
    let quote = BorrowQuote::compute(item, start, end)?;

    Ok(BorrowRequest {
        id: Uuid::new_v4().to_string(),
        item_id: item.id.clone(),
        borrower_id: borrower_id.to_string(),
        lender_id: item.owner_id.clone(),
        start_date: start,
        end_date: end,
        days: quote.days,
        rental_cents: quote.rental.cents(),
        deposit_cents: quote.deposit.cents(),
        status: BorrowStatus::Requested,
        rejection_reason: None,
        payment_session_id: None,
        created_at: now,
        updated_at: now,
        approved_at: None,
        returned_at: None,
        closed_at: None,
    })
}

// =============================================================================
// Transitions
// =============================================================================

/// `requested → approved`. Lender-only.
pub fn approve(req: &mut BorrowRequest, acting_user: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if req.lender_id != acting_user {
        return Err(CoreError::Forbidden("only the lender can approve a request"));
    }
    if req.status != BorrowStatus::Requested {
        return Err(CoreError::borrow_transition(req.status, "approve"));
    }
    req.status = BorrowStatus::Approved;
    req.approved_at = Some(now);
    req.updated_at = now;
    Ok(())
}

/// `requested|approved → rejected` with a reason. Lender-only; rejecting an
/// already-approved request is allowed as long as payment has not settled.
pub fn reject(
    req: &mut BorrowRequest,
    acting_user: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if req.lender_id != acting_user {
        return Err(CoreError::Forbidden("only the lender can reject a request"));
    }
    match req.status {
        BorrowStatus::Requested | BorrowStatus::Approved => {
            req.status = BorrowStatus::Rejected;
            req.rejection_reason = Some(reason.to_string());
            req.updated_at = now;
            Ok(())
        }
        _ => Err(CoreError::borrow_transition(req.status, "reject")),
    }
}

/// `approved → rejected` driven by an expired payment session, not a person.
/// Same terminal state as a lender rejection; the reason records the cause.
pub fn expire_payment(req: &mut BorrowRequest, now: DateTime<Utc>) -> CoreResult<()> {
    if req.status != BorrowStatus::Approved {
        return Err(CoreError::borrow_transition(req.status, "expire payment"));
    }
    req.status = BorrowStatus::Rejected;
    req.rejection_reason = Some("payment session expired".to_string());
    req.updated_at = now;
    Ok(())
}

/// `approved → active`, driven by payment reconciliation. Records the session
/// that settled the charge.
pub fn activate(req: &mut BorrowRequest, session_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if req.status != BorrowStatus::Approved {
        return Err(CoreError::borrow_transition(req.status, "activate"));
    }
    req.status = BorrowStatus::Active;
    req.payment_session_id = Some(session_id.to_string());
    req.updated_at = now;
    Ok(())
}

/// `active → returned`. Borrower-only. No date guard: early return is fine.
pub fn mark_returned(
    req: &mut BorrowRequest,
    acting_user: &str,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if req.borrower_id != acting_user {
        return Err(CoreError::Forbidden(
            "only the borrower can mark an item returned",
        ));
    }
    if req.status != BorrowStatus::Active {
        return Err(CoreError::borrow_transition(req.status, "mark returned"));
    }
    req.status = BorrowStatus::Returned;
    req.returned_at = Some(now);
    req.updated_at = now;
    Ok(())
}

/// `returned → closed`. Lender-only; this is the step that releases the
/// deposit and frees the item.
pub fn confirm_return(
    req: &mut BorrowRequest,
    acting_user: &str,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if req.lender_id != acting_user {
        return Err(CoreError::Forbidden(
            "only the lender can confirm a return",
        ));
    }
    if req.status != BorrowStatus::Returned {
        return Err(CoreError::borrow_transition(req.status, "confirm return"));
    }
    req.status = BorrowStatus::Closed;
    req.closed_at = Some(now);
    req.updated_at = now;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemCondition, ItemMode, ItemStatus};
    use chrono::Duration;

    fn borrow_item(owner: &str, daily: i64, deposit: i64) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            title: "Projector".to_string(),
            description: "1080p".to_string(),
            category: "electronics".to_string(),
            condition: ItemCondition::LikeNew,
            mode: ItemMode::Borrow,
            buy_price_cents: None,
            daily_price_cents: Some(daily),
            deposit_cents: Some(deposit),
            status: ItemStatus::Available,
            holder: None,
            images: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn window(days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now();
        (start, start + Duration::days(days))
    }

    #[test]
    fn test_quote_three_days() {
        // $10/day for 3 days + $20 deposit = $50 charge
        let item = borrow_item("lender", 1000, 2000);
        let (start, end) = window(3);
        let quote = BorrowQuote::compute(&item, start, end).unwrap();

        assert_eq!(quote.days, 3);
        assert_eq!(quote.rental.cents(), 3000);
        assert_eq!(quote.deposit.cents(), 2000);
        assert_eq!(quote.total().cents(), 5000);
    }

    #[test]
    fn test_quote_partial_day_rounds_up() {
        let item = borrow_item("lender", 1000, 0);
        let start = Utc::now();
        let end = start + Duration::hours(36);
        let quote = BorrowQuote::compute(&item, start, end).unwrap();
        assert_eq!(quote.days, 2);
    }

    #[test]
    fn test_quote_sub_day_charges_one() {
        let item = borrow_item("lender", 1000, 0);
        let start = Utc::now();
        let end = start + Duration::hours(3);
        let quote = BorrowQuote::compute(&item, start, end).unwrap();
        assert_eq!(quote.days, 1);
        assert_eq!(quote.rental.cents(), 1000);
    }

    #[test]
    fn test_quote_rejects_inverted_and_empty_windows() {
        let item = borrow_item("lender", 1000, 0);
        let start = Utc::now();
        assert!(BorrowQuote::compute(&item, start, start).is_err());
        assert!(BorrowQuote::compute(&item, start, start - Duration::days(1)).is_err());
    }

    #[test]
    fn test_quote_rejects_oversized_window() {
        let item = borrow_item("lender", 1000, 0);
        let (start, end) = window(MAX_BORROW_DAYS + 1);
        let err = BorrowQuote::compute(&item, start, end).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange(_)));
    }

    #[test]
    fn test_create_freezes_quote() {
        let mut item = borrow_item("lender", 1000, 2000);
        let (start, end) = window(3);
        let req = create_request(&item, "borrower", start, end, Utc::now()).unwrap();

        assert_eq!(req.status, BorrowStatus::Requested);
        assert_eq!(req.rental_cents, 3000);
        assert_eq!(req.deposit_cents, 2000);
        assert_eq!(req.total().cents(), 5000);

        // Re-pricing never touches the frozen quote.
        item.daily_price_cents = Some(9999);
        assert_eq!(req.rental_cents, 3000);
    }

    #[test]
    fn test_create_rejects_self_borrow() {
        let item = borrow_item("alice", 1000, 0);
        let (start, end) = window(2);
        let err = create_request(&item, "alice", start, end, Utc::now()).unwrap_err();
        assert_eq!(err, CoreError::SelfBorrow);
    }

    #[test]
    fn test_create_rejects_past_start() {
        let item = borrow_item("lender", 1000, 0);
        let start = Utc::now() - Duration::days(2);
        let end = start + Duration::days(3);
        let err = create_request(&item, "borrower", start, end, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange(_)));
    }

    #[test]
    fn test_create_rejects_buy_only_item() {
        let mut item = borrow_item("lender", 1000, 0);
        item.mode = ItemMode::Buy;
        let (start, end) = window(2);
        let err = create_request(&item, "borrower", start, end, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::NotAvailable { .. }));
    }

    fn fresh_request() -> BorrowRequest {
        let item = borrow_item("lender", 1000, 2000);
        let (start, end) = window(3);
        create_request(&item, "borrower", start, end, Utc::now()).unwrap()
    }

    #[test]
    fn test_full_happy_path() {
        let mut req = fresh_request();

        approve(&mut req, "lender", Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Approved);
        assert!(req.approved_at.is_some());

        activate(&mut req, "cs_42", Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Active);
        assert_eq!(req.payment_session_id.as_deref(), Some("cs_42"));

        mark_returned(&mut req, "borrower", Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Returned);

        confirm_return(&mut req, "lender", Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Closed);
        assert!(req.closed_at.is_some());
    }

    #[test]
    fn test_approve_is_lender_only() {
        let mut req = fresh_request();
        let err = approve(&mut req, "borrower", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        assert_eq!(req.status, BorrowStatus::Requested);
    }

    #[test]
    fn test_reject_records_reason() {
        let mut req = fresh_request();
        reject(&mut req, "lender", "need it that week", Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Rejected);
        assert_eq!(req.rejection_reason.as_deref(), Some("need it that week"));
    }

    #[test]
    fn test_reject_after_approve_allowed_until_active() {
        let mut req = fresh_request();
        approve(&mut req, "lender", Utc::now()).unwrap();
        reject(&mut req, "lender", "changed my mind", Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Rejected);

        let mut req2 = fresh_request();
        approve(&mut req2, "lender", Utc::now()).unwrap();
        activate(&mut req2, "cs_1", Utc::now()).unwrap();
        assert!(reject(&mut req2, "lender", "too late", Utc::now()).is_err());
    }

    #[test]
    fn test_activate_requires_approved() {
        let mut req = fresh_request();
        let err = activate(&mut req, "cs_1", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_expire_payment_rejects_with_reason() {
        let mut req = fresh_request();
        approve(&mut req, "lender", Utc::now()).unwrap();
        expire_payment(&mut req, Utc::now()).unwrap();
        assert_eq!(req.status, BorrowStatus::Rejected);
        assert_eq!(
            req.rejection_reason.as_deref(),
            Some("payment session expired")
        );
    }

    #[test]
    fn test_return_is_borrower_only_and_confirm_is_lender_only() {
        let mut req = fresh_request();
        approve(&mut req, "lender", Utc::now()).unwrap();
        activate(&mut req, "cs_9", Utc::now()).unwrap();

        assert!(matches!(
            mark_returned(&mut req, "lender", Utc::now()).unwrap_err(),
            CoreError::Forbidden(_)
        ));
        mark_returned(&mut req, "borrower", Utc::now()).unwrap();

        assert!(matches!(
            confirm_return(&mut req, "borrower", Utc::now()).unwrap_err(),
            CoreError::Forbidden(_)
        ));
        confirm_return(&mut req, "lender", Utc::now()).unwrap();
    }

    #[test]
    fn test_confirm_before_return_is_invalid() {
        let mut req = fresh_request();
        approve(&mut req, "lender", Utc::now()).unwrap();
        activate(&mut req, "cs_9", Utc::now()).unwrap();

        let err = confirm_return(&mut req, "lender", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut req = fresh_request();
        reject(&mut req, "lender", "no", Utc::now()).unwrap();

        assert!(approve(&mut req, "lender", Utc::now()).is_err());
        assert!(activate(&mut req, "cs_1", Utc::now()).is_err());
        assert!(mark_returned(&mut req, "borrower", Utc::now()).is_err());
        assert_eq!(req.status, BorrowStatus::Rejected);
    }
}
