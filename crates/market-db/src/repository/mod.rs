//! # Repository Module
//!
//! Database repository implementations for Campus Market.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Lifecycle service                                                     │
//! │       │                                                                 │
//! │       │  db.items().reserve(&id, &holder)                              │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ItemRepository                                                        │
//! │  ├── get / list / insert / update_listing / delete                     │
//! │  ├── reserve(&self, id, holder)      ← conditional UPDATE              │
//! │  ├── release(&self, id, holder)      ← conditional UPDATE              │
//! │  └── finalize(&self, id, holder, to) ← conditional UPDATE              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                        │
//! │  • Race-sensitive transitions share one idiom (rows_affected check)    │
//! │  • Services compose repositories without writing SQL                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - Catalog CRUD and the reservation primitives
//! - [`order::OrderRepository`] - Order persistence and transitions
//! - [`borrow::BorrowRepository`] - Borrow request persistence and transitions
//! - [`payment::SessionRepository`] - Payment session audit trail
//! - [`deposit::DepositRepository`] - Deposit hold/release ledger

pub mod borrow;
pub mod deposit;
pub mod item;
pub mod order;
pub mod payment;
