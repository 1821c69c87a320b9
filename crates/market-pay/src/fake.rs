//! # Fake Checkout Provider
//!
//! In-memory [`CheckoutProvider`] for tests. Sessions start `open`; the test
//! flips them with [`FakeCheckout::mark_paid`] / [`FakeCheckout::mark_expired`]
//! to simulate the buyer paying or walking away.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use market_core::SessionStatus;

use crate::error::{PayError, PayResult};
use crate::provider::{CheckoutProvider, CreatedSession, SessionRequest, SessionSnapshot};

/// In-memory checkout provider.
#[derive(Debug, Default)]
pub struct FakeCheckout {
    sessions: Mutex<HashMap<String, SessionStatus>>,
    counter: AtomicU64,
}

impl FakeCheckout {
    pub fn new() -> Self {
        FakeCheckout::default()
    }

    /// Simulates the buyer completing payment on the hosted page.
    pub async fn mark_paid(&self, session_id: &str) {
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), SessionStatus::Paid);
    }

    /// Simulates the session lapsing without payment.
    pub async fn mark_expired(&self, session_id: &str) {
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), SessionStatus::Expired);
    }
}

#[async_trait::async_trait]
impl CheckoutProvider for FakeCheckout {
    async fn create_session(&self, request: &SessionRequest) -> PayResult<CreatedSession> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");

        self.sessions
            .lock()
            .await
            .insert(id.clone(), SessionStatus::Open);

        Ok(CreatedSession {
            url: format!("https://checkout.test/pay/{id}"),
            payload: format!(
                "{{\"id\":\"{id}\",\"amount\":{},\"reference\":\"{}\"}}",
                request.amount_cents, request.reference
            ),
            id,
        })
    }

    async fn session_status(&self, session_id: &str) -> PayResult<SessionSnapshot> {
        let sessions = self.sessions.lock().await;
        let status = sessions
            .get(session_id)
            .copied()
            .ok_or_else(|| PayError::UnknownSession(session_id.to_string()))?;

        Ok(SessionSnapshot {
            id: session_id.to_string(),
            status,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
