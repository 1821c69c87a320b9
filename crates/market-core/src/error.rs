//! # Domain Errors
//!
//! Typed errors for the transaction core. Every rule violation the lifecycle
//! can produce has a variant here - callers map them to HTTP statuses at the
//! boundary, and tests assert on them directly.
//!
//! ## Error Philosophy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Illegal transitions are TYPED ERRORS, never silent writes.            │
//! │                                                                         │
//! │  An approve on a rejected request does not "fix" the status - it       │
//! │  returns InvalidTransition { entity, from, event } and changes         │
//! │  nothing. The state machine is closed.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::{BorrowStatus, OrderStatus};

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

/// Errors produced by the transaction rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Referenced item does not exist.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Referenced borrow request does not exist.
    #[error("borrow request not found: {0}")]
    BorrowNotFound(String),

    /// Referenced payment session does not exist.
    #[error("payment session not found: {0}")]
    SessionNotFound(String),

    /// The item is not available (already reserved, rented, or sold), or its
    /// mode does not permit the attempted transaction.
    #[error("item {item_id} is not available for {wanted}")]
    NotAvailable {
        item_id: String,
        /// What the caller wanted: "purchase" or "borrow".
        wanted: &'static str,
    },

    /// An owner may not buy their own item.
    #[error("cannot purchase your own item")]
    SelfTrade,

    /// An owner may not borrow their own item.
    #[error("cannot borrow your own item")]
    SelfBorrow,

    /// end_date is not after start_date, or the window exceeds the maximum.
    #[error("invalid borrow window: {0}")]
    InvalidRange(String),

    /// The acting user is not permitted to perform this operation on this
    /// record (wrong buyer, lender, borrower, or owner).
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// A status transition that the state machine does not define.
    #[error("{entity} cannot {event} from status {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        event: &'static str,
    },

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Item cannot be purchased right now.
    pub fn not_for_sale(item_id: impl Into<String>) -> Self {
        CoreError::NotAvailable {
            item_id: item_id.into(),
            wanted: "purchase",
        }
    }

    /// Item cannot be borrowed right now.
    pub fn not_for_borrow(item_id: impl Into<String>) -> Self {
        CoreError::NotAvailable {
            item_id: item_id.into(),
            wanted: "borrow",
        }
    }

    /// An order transition the state machine does not define.
    pub fn order_transition(from: OrderStatus, event: &'static str) -> Self {
        CoreError::InvalidTransition {
            entity: "order",
            from: format!("{from:?}").to_lowercase(),
            event,
        }
    }

    /// A borrow transition the state machine does not define.
    pub fn borrow_transition(from: BorrowStatus, event: &'static str) -> Self {
        CoreError::InvalidTransition {
            entity: "borrow request",
            from: format!("{from:?}").to_lowercase(),
            event,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation failures, reported at the API boundary before any state
/// is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must not exceed {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be a positive amount in cents")]
    NonPositiveAmount { field: &'static str },

    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },

    /// Mode-dependent price field missing or unexpectedly present.
    #[error("{0}")]
    ModeMismatch(&'static str),
}

// =============================================================================
// Unit Tests
// =============================================================================
