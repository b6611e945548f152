pub mod client;
pub mod ocr;
pub mod payment;
pub mod poem;
pub mod protocol;
pub mod rest;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

// Re-export the handlers so the binary can build the web server router.
pub use ocr::analyze_document_handler;
pub use payment::{
    check_access_handler, create_checkout_handler, grant_access_handler, payment_webhook_handler,
};
pub use poem::generate_poem_handler;

/// Builds the API route table over the shared application state.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/poem/generate", post(generate_poem_handler))
        .route("/api/ocr/image", post(analyze_document_handler))
        .route("/api/payment/check-access", get(check_access_handler))
        .route("/api/payment/set-access-cookie", post(grant_access_handler))
        .route("/api/payment/create-checkout", post(create_checkout_handler))
        .route("/api/webhooks/payments", post(payment_webhook_handler))
        .with_state(app_state)
}
