//! # HTTP Routes
//!
//! The public surface, all under `/api`:
//!
//! ```text
//! POST   /api/items                       create listing
//! GET    /api/items                       list (filters: owner, category, status)
//! GET    /api/items/:id                   fetch listing
//! PUT    /api/items/:id                   edit listing (owner)
//! DELETE /api/items/:id                   delete listing (owner, available only)
//!
//! POST   /api/orders                      buy: create + reserve
//! GET    /api/orders                      my orders (buyer or seller)
//! GET    /api/orders/:id                  fetch (participants)
//! POST   /api/orders/:id/complete         buyer confirms handoff
//! POST   /api/orders/:id/cancel           buyer or seller
//!
//! POST   /api/borrow                      request: create + reserve
//! GET    /api/borrow                      my requests (borrower or lender)
//! GET    /api/borrow/:id                  fetch (participants)
//! POST   /api/borrow/:id/approve          lender verdict (approve or reject)
//! POST   /api/borrow/:id/return           borrower
//! POST   /api/borrow/:id/confirm-return   lender; releases deposit
//!
//! POST   /api/payments/checkout           open a session for an order/borrow
//! GET    /api/payments/status/:session_id reconcile + report
//!
//! GET    /api/health
//! ```

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod borrows;
pub mod items;
pub mod orders;
pub mod payments;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/items", post(items::create).get(items::list))
        .route(
            "/items/:id",
            get(items::get_one).put(items::update).delete(items::delete),
        )
        .route("/orders", post(orders::create).get(orders::list))
        .route("/orders/:id", get(orders::get_one))
        .route("/orders/:id/complete", post(orders::complete))
        .route("/orders/:id/cancel", post(orders::cancel))
        .route("/borrow", post(borrows::create).get(borrows::list))
        .route("/borrow/:id", get(borrows::get_one))
        .route("/borrow/:id/approve", post(borrows::decide))
        .route("/borrow/:id/return", post(borrows::mark_returned))
        .route("/borrow/:id/confirm-return", post(borrows::confirm_return))
        .route("/payments/checkout", post(payments::checkout))
        .route("/payments/status/:session_id", get(payments::status));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
