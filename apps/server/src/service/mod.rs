//! # Lifecycle Services
//!
//! The orchestration layer between the HTTP routes and the workspace crates.
//! Each service owns one lifecycle:
//!
//! - [`catalog::CatalogService`] - listings: create, read, update, delete
//! - [`order::OrderService`] - buy: create (reserve), complete, cancel
//! - [`borrow::BorrowService`] - borrow: request, approve/reject, return, close
//! - [`checkout::CheckoutService`] - money: start checkout, reconcile
//!
//! Services enforce the rules through market-core *before* touching storage,
//! then rely on market-db's conditional updates to re-check under
//! concurrency. A check that passes here can still lose the race there; the
//! resulting Conflict is a normal answer, not a bug.

pub mod borrow;
pub mod catalog;
pub mod checkout;
pub mod order;
