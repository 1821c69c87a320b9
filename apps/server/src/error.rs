//! # API Error Types
//!
//! The single error type handlers return, and its mapping to HTTP statuses.
//!
//! ## Status Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  400 BadRequest   validation failures, bad date ranges, self-trade     │
//! │  401 Unauthorized missing caller identity                              │
//! │  403 Forbidden    wrong buyer/lender/borrower/owner                    │
//! │  404 NotFound     unknown item/order/borrow/session                    │
//! │  409 Conflict     lost reservation race, illegal transition, replay    │
//! │  502 BadGateway   the payment processor is down or talking nonsense    │
//! │  500 Internal     everything else (logged, not leaked)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! 409 deserves a note: it is the *normal* answer for the loser of a race.
//! Two buyers hit "buy" on the same lamp; one gets 201, one gets 409. The
//! client retries on a different item, not the same one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use market_core::CoreError;
use market_db::DbError;
use market_pay::PayError;

/// Result alias for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

/// API-level errors, one variant per HTTP status we emit.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("missing caller identity")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("payment provider unavailable: {0}")]
    BadGateway(String),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail goes to the log, not the client
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal server error");
                "internal server error".to_string()
            }
            other => {
                if status.is_server_error() {
                    error!(error = %other, "Request failed");
                } else {
                    warn!(error = %other, status = status.as_u16(), "Request rejected");
                }
                other.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Domain rule violations map by what went wrong, not where.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::BorrowNotFound(_)
            | CoreError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),

            CoreError::NotAvailable { .. } | CoreError::InvalidTransition { .. } => {
                ApiError::Conflict(err.to_string())
            }

            CoreError::Forbidden(_) => ApiError::Forbidden(err.to_string()),

            CoreError::SelfTrade
            | CoreError::SelfBorrow
            | CoreError::InvalidRange(_)
            | CoreError::Validation(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::Conflict { .. } | DbError::UniqueViolation { .. } => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PayError> for ApiError {
    fn from(err: PayError) -> Self {
        match err {
            PayError::UnknownSession(id) => ApiError::NotFound(format!("unknown session: {id}")),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}
