//! # Application State
//!
//! Everything a handler needs, cheap to clone: the database handle, the
//! checkout provider behind its trait object, and the redirect URLs the
//! processor needs.

use std::sync::Arc;

use market_db::Database;
use market_pay::CheckoutProvider;

use crate::service::borrow::BorrowService;
use crate::service::catalog::CatalogService;
use crate::service::checkout::CheckoutService;
use crate::service::order::OrderService;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub provider: Arc<dyn CheckoutProvider>,
    pub success_url: String,
    pub cancel_url: String,
}

impl AppState {
    pub fn new(
        db: Database,
        provider: Arc<dyn CheckoutProvider>,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        AppState {
            db,
            provider,
            success_url,
            cancel_url,
        }
    }

    /// Catalog (item) operations.
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone())
    }

    /// Order lifecycle operations.
    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db.clone())
    }

    /// Borrow lifecycle operations.
    pub fn borrows(&self) -> BorrowService {
        BorrowService::new(self.db.clone())
    }

    /// Checkout orchestration against the payment processor.
    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(
            self.db.clone(),
            Arc::clone(&self.provider),
            self.success_url.clone(),
            self.cancel_url.clone(),
        )
    }
}
