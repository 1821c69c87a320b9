//! # market-pay: Payment Processor Integration
//!
//! The boundary between Campus Market and the external hosted-checkout
//! processor.
//!
//! ## The Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Hosted Checkout Flow                                  │
//! │                                                                         │
//! │  apps/server                    market-pay               processor     │
//! │       │                             │                        │          │
//! │       │ create_session(amount,...)  │                        │          │
//! │       ├────────────────────────────►│  POST /sessions        │          │
//! │       │                             ├───────────────────────►│          │
//! │       │   CreatedSession {id, url}  │                        │          │
//! │       │◄────────────────────────────┤                        │          │
//! │       │                             │                        │          │
//! │       │  (buyer pays on the         │                        │          │
//! │       │   processor's page)         │                        │          │
//! │       │                             │                        │          │
//! │       │ session_status(id)          │                        │          │
//! │       ├────────────────────────────►│  GET /sessions/{id}    │          │
//! │       │                             ├───────────────────────►│          │
//! │       │   SessionSnapshot {status}  │                        │          │
//! │       │◄────────────────────────────┤                        │          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card data never touches this system: we create a session, hand the buyer
//! the processor's URL, and later ask the processor what happened. The
//! processor's answer is authoritative; nothing here marks anything paid.
//!
//! ## Modules
//!
//! - [`provider`] - The [`CheckoutProvider`] trait and its request/response types
//! - [`hosted`] - reqwest client for the real hosted checkout API
//! - [`fake`] - In-memory provider for tests
//! - [`error`] - Provider error types

pub mod error;
pub mod fake;
pub mod hosted;
pub mod provider;

pub use error::{PayError, PayResult};
pub use fake::FakeCheckout;
pub use hosted::HostedCheckout;
pub use provider::{CheckoutProvider, CreatedSession, SessionRequest, SessionSnapshot};
