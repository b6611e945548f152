//! services/api/src/adapters/payments.rs
//!
//! This module contains the adapter for the payment provider's
//! checkout-session API. It implements the `CheckoutService` port from the
//! `core` crate.

use async_trait::async_trait;
use serde::Deserialize;
use sintgpt_core::ports::{CheckoutService, PortError, PortResult};
use tracing::info;

const TEST_BASE_URL: &str = "https://test.dodopayments.com";
const LIVE_BASE_URL: &str = "https://live.dodopayments.com";

/// Accepted payment methods for the hosted checkout page; buy-now-pay-later
/// options are deliberately excluded.
const ALLOWED_PAYMENT_METHODS: &[&str] = &[
    "ideal",
    "credit",
    "debit",
    "paypal",
    "bancontact_card",
    "apple_pay",
    "google_pay",
];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CheckoutService` against the Dodo Payments
/// REST API.
#[derive(Clone)]
pub struct DodoCheckoutAdapter {
    http: reqwest::Client,
    api_key: String,
    product_id: String,
    base_url: String,
}

impl DodoCheckoutAdapter {
    /// Creates a new `DodoCheckoutAdapter`. `live_mode` selects the real
    /// payment environment; otherwise everything goes to test mode.
    pub fn new(api_key: String, product_id: String, live_mode: bool) -> Self {
        let base_url = if live_mode { LIVE_BASE_URL } else { TEST_BASE_URL };
        Self {
            http: reqwest::Client::new(),
            api_key,
            product_id,
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct CheckoutSession {
    checkout_url: String,
}

//=========================================================================================
// `CheckoutService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CheckoutService for DodoCheckoutAdapter {
    /// Creates a checkout session and returns the hosted page's URL.
    async fn create_checkout(&self, return_base_url: &str) -> PortResult<String> {
        info!("Creating checkout session...");

        let body = serde_json::json!({
            "product_cart": [{ "product_id": self.product_id, "quantity": 1 }],
            "return_url": format!("{}/?payment=success", return_base_url),
            "cancel_url": format!("{}/?payment=cancelled", return_base_url),
            "allowed_payment_method_types": ALLOWED_PAYMENT_METHODS,
        });

        let response = self
            .http
            .post(format!("{}/checkouts", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("checkout request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PortError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| PortError::MalformedResponse(e.to_string()))?;

        info!("Checkout session created: {}", session.checkout_url);
        Ok(session.checkout_url)
    }
}
