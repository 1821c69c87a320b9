//! # market-server: Campus Market HTTP API
//!
//! The application layer: axum routes, caller identity, lifecycle services,
//! and the error → HTTP status mapping.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Lifecycle                                │
//! │                                                                         │
//! │  HTTP request (X-User-Id from the gateway)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  routes/   ← deserialize, extract caller, call a service              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  service/  ← the lifecycle orchestration: reserve-then-insert,        │
//! │              checkout, reconcile, compensation on failure              │
//! │       │                                                                 │
//! │       ├──► market-core   (rules, state machines, validation)           │
//! │       ├──► market-db     (conditional-update repositories)             │
//! │       └──► market-pay    (hosted checkout provider)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  error.rs  ← ApiError → HTTP status + JSON body                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod service;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
