//! # The CheckoutProvider Trait
//!
//! One seam, two implementations: [`crate::hosted::HostedCheckout`] talks to
//! the real processor, [`crate::fake::FakeCheckout`] drives tests. The
//! orchestrator in apps/server holds an `Arc<dyn CheckoutProvider>` and never
//! knows which one it has.

use async_trait::async_trait;

use market_core::SessionStatus;

use crate::error::PayResult;

// =============================================================================
// Request / Response Types
// =============================================================================

/// What we ask the processor to collect.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Charge amount in cents. The server computes this from frozen
    /// transaction amounts; it is never taken from client input.
    pub amount_cents: i64,
    /// Lowercase ISO currency code, e.g. "usd".
    pub currency: String,
    /// Line shown on the processor's checkout page.
    pub description: String,
    /// Our reference for the charge (order or borrow ID), echoed back in
    /// the processor's metadata.
    pub reference: String,
    /// Where the processor sends the buyer after paying.
    pub success_url: String,
    /// Where the processor sends the buyer if they bail out.
    pub cancel_url: String,
}

/// A session the processor opened for us.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    /// The processor's session identifier. Becomes our primary key.
    pub id: String,
    /// The hosted checkout page the buyer is redirected to.
    pub url: String,
    /// Raw provider response, kept verbatim for the audit trail.
    pub payload: String,
}

/// The processor's current view of a session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: String,
    pub status: SessionStatus,
}

// =============================================================================
// Trait
// =============================================================================

/// An external hosted-checkout processor.
///
/// Implementations must be cheap to call repeatedly: `session_status` is
/// polled during reconciliation and must be a pure read on the processor
/// side (asking never changes the session).
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Opens a checkout session for the given charge.
    async fn create_session(&self, request: &SessionRequest) -> PayResult<CreatedSession>;

    /// Asks the processor what happened to a session.
    async fn session_status(&self, session_id: &str) -> PayResult<SessionSnapshot>;
}
