//! Payment handlers: start checkout, reconcile status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use market_core::{HolderKind, SessionStatus};

use crate::error::{ApiError, ApiResult};
use crate::identity::Caller;
use crate::service::checkout::CheckoutStarted;
use crate::state::AppState;

/// Exactly one of `order_id` / `borrow_id` names the thing being paid for.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub order_id: Option<String>,
    pub borrow_id: Option<String>,
    /// Client origin to redirect back to after payment. Falls back to the
    /// configured public base URL.
    pub origin_url: Option<String>,
}

/// Reconciled session state, as reported to the client.
#[derive(Debug, Serialize)]
pub struct PaymentStatus {
    pub session_id: String,
    pub status: SessionStatus,
    pub kind: HolderKind,
    pub subject_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

pub async fn checkout(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<(StatusCode, Json<CheckoutStarted>)> {
    let origin = body.origin_url.as_deref();
    let started = match (&body.order_id, &body.borrow_id) {
        (Some(order_id), None) => {
            state
                .checkout()
                .start_for_order(&user_id, order_id, origin)
                .await?
        }
        (None, Some(borrow_id)) => {
            state
                .checkout()
                .start_for_borrow(&user_id, borrow_id, origin)
                .await?
        }
        _ => {
            return Err(ApiError::BadRequest(
                "provide exactly one of order_id or borrow_id".to_string(),
            ))
        }
    };

    Ok((StatusCode::CREATED, Json(started)))
}

/// Reconciles against the processor and reports where the session stands.
/// The redirect landing page and any poller both call this; replays are
/// harmless by construction.
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<PaymentStatus>> {
    let session = state.checkout().reconcile(&session_id).await?;

    Ok(Json(PaymentStatus {
        session_id: session.id,
        status: session.status,
        kind: session.subject_kind,
        subject_id: session.subject_id,
        amount_cents: session.amount_cents,
        currency: session.currency,
    }))
}
