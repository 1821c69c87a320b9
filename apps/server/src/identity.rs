//! # Caller Identity
//!
//! Requests reach this service through a gateway that authenticates the user
//! and forwards their ID in `X-User-Id`. This module extracts it; the
//! services decide what that user may do. No transaction operation runs
//! without an explicit acting user.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, extracted from `X-User-Id`.
///
/// ## Usage
/// ```rust,ignore
/// async fn create_order(
///     Caller(user_id): Caller,
///     State(state): State<AppState>,
///     Json(body): Json<CreateOrderBody>,
/// ) -> ApiResult<Json<OrderDto>> { ... }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        Ok(Caller(user_id.to_string()))
    }
}
