//! # market-db: Database Layer for Campus Market
//!
//! SQLite storage for the marketplace transaction core, using sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Campus Market Data Flow                             │
//! │                                                                         │
//! │  HTTP handler (create order, approve borrow, reconcile payment)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    market-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ItemRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ BorrowRepo    │    │              │  │   │
//! │  │   │ Management    │    │ SessionRepo   │    │              │  │   │
//! │  │   │               │    │ DepositRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                        SQLite Database                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The One Rule of This Crate
//!
//! **No read-then-write on a status path.** Every lifecycle transition is a
//! single conditional UPDATE that names the expected prior status in its
//! WHERE clause; `rows_affected == 0` means someone else won the race and
//! surfaces as [`DbError::Conflict`]. This is what makes reservation,
//! reconciliation, and deposit release safe under concurrency.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::borrow::BorrowRepository;
pub use repository::deposit::DepositRepository;
pub use repository::item::{ItemFilter, ItemRepository, NewItem, UpdateItem};
pub use repository::order::OrderRepository;
pub use repository::payment::SessionRepository;
