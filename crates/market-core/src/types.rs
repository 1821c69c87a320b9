//! # Domain Types
//!
//! Core domain types for the marketplace transaction lifecycle.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │     Order       │   │  BorrowRequest  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  mode           │   │  amount (frozen)│   │  rental (frozen)│       │
//! │  │  status+holder  │   │  status         │   │  deposit+status │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ PaymentSession  │   │  DepositEntry   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  id (external)  │   │  borrow_id (PK) │                             │
//! │  │  subject kind+id│   │  held/released  │                             │
//! │  │  open/paid/exp. │   │  at-most-once   │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reservation Encoding
//! Item availability is the contended resource. A reservation is a logical
//! lock encoded in the item's `status` plus a holder reference - not a
//! database lock - so nothing blocks across the asynchronous payment gap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Item Enums
// =============================================================================

/// How an item may be transacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ItemMode {
    /// Outright purchase only.
    Buy,
    /// Borrow for a date range only.
    Borrow,
    /// Either.
    Both,
}

impl ItemMode {
    /// Whether this mode permits an outright purchase.
    #[inline]
    pub const fn allows_buy(&self) -> bool {
        matches!(self, ItemMode::Buy | ItemMode::Both)
    }

    /// Whether this mode permits borrowing.
    #[inline]
    pub const fn allows_borrow(&self) -> bool {
        matches!(self, ItemMode::Borrow | ItemMode::Both)
    }
}

/// Physical condition of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

/// Availability status of an item.
///
/// ## The Four States
/// ```text
/// available ──reserve──► reserved ──finalize──► rented ──release──► available
///     ▲                     │      └─finalize─► sold (terminal)
///     └──────release────────┘
/// ```
/// `reserved` means an unpaid Order or BorrowRequest holds the item;
/// `rented`/`sold` mean money settled. Only the lifecycle managers drive
/// these transitions - no client request sets status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Free to be bought or borrowed.
    Available,
    /// Held by an unpaid Order or BorrowRequest.
    Reserved,
    /// An active borrow is underway.
    Rented,
    /// Sold outright (terminal).
    Sold,
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Available
    }
}

/// What kind of transaction holds a reservation (or owns a payment session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    Order,
    Borrow,
}

/// A reservation holder: which Order/BorrowRequest currently holds an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub kind: HolderKind,
    pub id: String,
}

impl Holder {
    /// Holder reference for an order.
    pub fn order(id: impl Into<String>) -> Self {
        Holder {
            kind: HolderKind::Order,
            id: id.into(),
        }
    }

    /// Holder reference for a borrow request.
    pub fn borrow(id: impl Into<String>) -> Self {
        Holder {
            kind: HolderKind::Borrow,
            id: id.into(),
        }
    }
}

// =============================================================================
// Item
// =============================================================================

/// A listing owned by exactly one user.
///
/// Prices are optional because they are mode-dependent: `buy_price_cents` is
/// present iff the mode allows buying; `daily_price_cents` (and the deposit)
/// iff the mode allows borrowing. [`crate::validation::validate_listing`]
/// enforces this at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning user.
    pub owner_id: String,

    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: ItemCondition,
    pub mode: ItemMode,

    /// Purchase price in cents (iff mode allows buying).
    pub buy_price_cents: Option<i64>,

    /// Borrow price per day in cents (iff mode allows borrowing).
    pub daily_price_cents: Option<i64>,

    /// Refundable deposit in cents (iff mode allows borrowing; may be zero).
    pub deposit_cents: Option<i64>,

    /// Availability status. Owned by the Catalog Store.
    pub status: ItemStatus,

    /// Which transaction holds the item, when non-available.
    pub holder: Option<Holder>,

    /// Ordered image references.
    pub images: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Whether a buyer could start a purchase right now.
    pub fn can_buy(&self) -> bool {
        self.status == ItemStatus::Available && self.mode.allows_buy()
    }

    /// Whether a borrower could request this item right now.
    pub fn can_borrow(&self) -> bool {
        self.status == ItemStatus::Available && self.mode.allows_borrow()
    }

    /// Purchase price as Money.
    pub fn buy_price(&self) -> Option<Money> {
        self.buy_price_cents.map(Money::from_cents)
    }

    /// Daily borrow price as Money.
    pub fn daily_price(&self) -> Option<Money> {
        self.daily_price_cents.map(Money::from_cents)
    }

    /// Deposit as Money (zero when the listing carries none).
    pub fn deposit(&self) -> Money {
        Money::from_cents(self.deposit_cents.unwrap_or(0))
    }
}

// =============================================================================
// Order (buy transaction)
// =============================================================================

/// Status of a buy transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created and holding the item; payment not collected.
    Created,
    /// Payment confirmed by the processor.
    Paid,
    /// Buyer confirmed handoff; item sold (terminal).
    Completed,
    /// Cancelled before completion; item released (terminal).
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Created
    }
}

/// An outright purchase.
///
/// `amount_cents` is the item's buy price **at creation time** and never
/// changes afterwards, even if the listing is re-priced (snapshot pattern).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    /// Lookup key into the catalog - not a copy of the item.
    pub item_id: String,
    pub buyer_id: String,
    /// Item owner at creation time.
    pub seller_id: String,
    /// Frozen at creation.
    pub amount_cents: i64,
    pub status: OrderStatus,
    /// External checkout session, once checkout starts.
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The frozen charge amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// BorrowRequest
// =============================================================================

/// Status of a borrow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    /// Waiting for the lender's decision.
    Requested,
    /// Lender approved; waiting for payment.
    Approved,
    /// Lender declined (terminal); item released.
    Rejected,
    /// Payment confirmed; rental window underway.
    Active,
    /// Borrower handed the item back; waiting for lender confirmation.
    Returned,
    /// Lender confirmed return; deposit released (terminal).
    Closed,
}

impl BorrowStatus {
    /// Whether the request still holds (or will hold) the item.
    ///
    /// At most one request per item may be in one of these states at a time;
    /// the catalog reservation enforces it.
    #[inline]
    pub const fn holds_item(&self) -> bool {
        matches!(
            self,
            BorrowStatus::Requested | BorrowStatus::Approved | BorrowStatus::Active
        )
    }

    /// Whether this is a terminal state.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, BorrowStatus::Rejected | BorrowStatus::Closed)
    }
}

/// A request to borrow an item for a date range.
///
/// `days`, `rental_cents`, and `deposit_cents` are computed and frozen at
/// request time; the dates are immutable once approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BorrowRequest {
    pub id: String,
    pub item_id: String,
    pub borrower_id: String,
    /// Item owner at request time.
    pub lender_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Whole days in the window, minimum 1. Frozen.
    pub days: i64,
    /// days × item daily price at request time. Frozen.
    pub rental_cents: i64,
    /// Item deposit at request time. Frozen.
    pub deposit_cents: i64,
    pub status: BorrowStatus,
    /// Present iff the lender rejected (or the session expired).
    pub rejection_reason: Option<String>,
    /// External checkout session, once checkout starts.
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl BorrowRequest {
    /// Rental fee as Money.
    #[inline]
    pub fn rental(&self) -> Money {
        Money::from_cents(self.rental_cents)
    }

    /// Deposit as Money.
    #[inline]
    pub fn deposit(&self) -> Money {
        Money::from_cents(self.deposit_cents)
    }

    /// The single charge collected at checkout: rental + deposit.
    #[inline]
    pub fn total(&self) -> Money {
        self.rental() + self.deposit()
    }
}

// =============================================================================
// PaymentSession
// =============================================================================

/// Status of an external checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created at the processor; money not yet moved.
    Open,
    /// Processor confirmed payment.
    Paid,
    /// Session lapsed without payment.
    Expired,
}

/// One checkout session at the external processor.
///
/// Linked to exactly one Order or one BorrowRequest (never both). Created by
/// the checkout orchestrator; only `status` changes afterwards, and only via
/// reconciliation. Never deleted - this is the audit trail of money movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentSession {
    /// The processor's session identifier.
    pub id: String,
    pub subject_kind: HolderKind,
    pub subject_id: String,
    /// Amount requested from the processor, in cents.
    pub amount_cents: i64,
    pub currency: String,
    pub status: SessionStatus,
    /// Raw provider response, retained verbatim for audit.
    pub provider_payload: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Deposit Ledger
// =============================================================================

/// State of a held deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DepositState {
    /// Collected with the rental fee, earmarked for refund.
    Held,
    /// Refunded to the borrower after confirmed return.
    Released,
}

/// The refundable portion of a borrow payment, tracked separately from the
/// non-refundable rental fee.
///
/// Keyed by `borrow_id` - the idempotency key. One entry per request, one
/// release per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DepositEntry {
    pub borrow_id: String,
    pub amount_cents: i64,
    pub state: DepositState,
    pub held_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_permissions() {
        assert!(ItemMode::Buy.allows_buy());
        assert!(!ItemMode::Buy.allows_borrow());
        assert!(ItemMode::Borrow.allows_borrow());
        assert!(!ItemMode::Borrow.allows_buy());
        assert!(ItemMode::Both.allows_buy());
        assert!(ItemMode::Both.allows_borrow());
    }

    #[test]
    fn test_borrow_status_holds_item() {
        assert!(BorrowStatus::Requested.holds_item());
        assert!(BorrowStatus::Approved.holds_item());
        assert!(BorrowStatus::Active.holds_item());
        assert!(!BorrowStatus::Rejected.holds_item());
        assert!(!BorrowStatus::Returned.holds_item());
        assert!(!BorrowStatus::Closed.holds_item());
    }

    #[test]
    fn test_terminal_states() {
        assert!(BorrowStatus::Rejected.is_terminal());
        assert!(BorrowStatus::Closed.is_terminal());
        assert!(!BorrowStatus::Active.is_terminal());
    }

    #[test]
    fn test_item_status_default() {
        assert_eq!(ItemStatus::default(), ItemStatus::Available);
    }
}
