//! # Hosted Checkout Client
//!
//! reqwest client for the processor's session API. Thin by intent: build the
//! request, send it, map the response. Retries and reconciliation policy
//! belong to the caller.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use market_core::SessionStatus;

use crate::error::{PayError, PayResult};
use crate::provider::{CheckoutProvider, CreatedSession, SessionRequest, SessionSnapshot};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    amount: i64,
    currency: &'a str,
    description: &'a str,
    reference: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    id: String,
    #[serde(default)]
    url: Option<String>,
    status: String,
}

fn parse_status(raw: &str) -> PayResult<SessionStatus> {
    match raw {
        "open" | "unpaid" => Ok(SessionStatus::Open),
        // Some processors report "complete", some "paid"
        "paid" | "complete" => Ok(SessionStatus::Paid),
        "expired" => Ok(SessionStatus::Expired),
        other => Err(PayError::InvalidResponse(format!(
            "unknown session status '{other}'"
        ))),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for the hosted checkout API.
///
/// ## Construction
/// ```rust,ignore
/// let provider = HostedCheckout::new(
///     "https://checkout.example.com/v1".to_string(),
///     api_key,
/// );
/// let state: Arc<dyn CheckoutProvider> = Arc::new(provider);
/// ```
#[derive(Debug, Clone)]
pub struct HostedCheckout {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedCheckout {
    /// Creates a client against the given API base URL.
    pub fn new(base_url: String, api_key: String) -> Self {
        HostedCheckout {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl CheckoutProvider for HostedCheckout {
    async fn create_session(&self, request: &SessionRequest) -> PayResult<CreatedSession> {
        debug!(
            amount_cents = request.amount_cents,
            reference = %request.reference,
            "Creating checkout session"
        );

        let response = self
            .http
            .post(format!("{}/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateSessionBody {
                amount: request.amount_cents,
                currency: &request.currency,
                description: &request.description,
                reference: &request.reference,
                success_url: &request.success_url,
                cancel_url: &request.cancel_url,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Checkout session creation failed");
            return Err(PayError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        let session: SessionBody = serde_json::from_str(&body)
            .map_err(|e| PayError::InvalidResponse(e.to_string()))?;
        let url = session
            .url
            .ok_or_else(|| PayError::InvalidResponse("session has no checkout url".to_string()))?;

        Ok(CreatedSession {
            id: session.id,
            url,
            payload: body,
        })
    }

    async fn session_status(&self, session_id: &str) -> PayResult<SessionSnapshot> {
        let response = self
            .http
            .get(format!("{}/sessions/{session_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PayError::UnknownSession(session_id.to_string()));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(PayError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        let session: SessionBody = serde_json::from_str(&body)
            .map_err(|e| PayError::InvalidResponse(e.to_string()))?;

        Ok(SessionSnapshot {
            id: session.id,
            status: parse_status(&session.status)?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(parse_status("open").unwrap(), SessionStatus::Open);
        assert_eq!(parse_status("unpaid").unwrap(), SessionStatus::Open);
        assert_eq!(parse_status("paid").unwrap(), SessionStatus::Paid);
        assert_eq!(parse_status("complete").unwrap(), SessionStatus::Paid);
        assert_eq!(parse_status("expired").unwrap(), SessionStatus::Expired);
        assert!(parse_status("weird").is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HostedCheckout::new("https://pay.example.com/v1/".to_string(), "k".to_string());
        assert_eq!(client.base_url, "https://pay.example.com/v1");
    }
}
