//! # market-core: Pure Transaction Logic for Campus Market
//!
//! This crate is the **heart** of Campus Market. It contains the rules that
//! govern the marketplace transaction lifecycle as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Campus Market Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/server)                       │   │
//! │  │    create order ──► approve borrow ──► checkout ──► reconcile  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ market-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ lifecycle │  │ validation│  │   │
//! │  │   │   Item    │  │   Money   │  │  Order    │  │   rules   │  │   │
//! │  │   │  Order    │  │  (cents)  │  │  Borrow   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         market-db (storage)      market-pay (processor)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Order, BorrowRequest, PaymentSession, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`order`] - Order (buy) state machine
//! - [`borrow`] - BorrowRequest state machine and quote computation
//! - [`error`] - Domain error types
//! - [`validation`] - Listing and input validation
//!
//! ## Design Principles
//!
//! 1. **Closed state machines**: lifecycle status fields are enums with an
//!    explicit transition check - illegal transitions are typed errors, never
//!    silent field writes
//! 2. **Frozen amounts**: every monetary value on a transaction record is a
//!    snapshot taken at creation; later listing edits never change it
//! 3. **Integer money**: all monetary values are cents (i64)
//! 4. **Explicit identity**: every operation takes the acting user as a
//!    parameter; authorization is enforced here, not trusted from the caller

// =============================================================================
// Module Declarations
// =============================================================================

pub mod borrow;
pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use borrow::BorrowQuote;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency for every charge in v0.1.
///
/// The schema and the provider contract carry a currency column so this can
/// become per-listing later, but the runtime is single-currency for now.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Maximum length of a borrow window in days.
///
/// ## Business Reason
/// Prevents accidental year-long holds from a mistyped end date. Long-term
/// arrangements should be repeated short borrows.
pub const MAX_BORROW_DAYS: i64 = 90;
