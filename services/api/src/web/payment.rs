//! services/api/src/web/payment.rs
//!
//! The unlock flow: access check and grant via a prefixed HTTP-only
//! cookie, checkout-session creation, and the signed payment webhook.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use sha2::Sha256;
use sintgpt_core::ports::PortError;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::client::{has_unlimited_access, ACCESS_COOKIE_PREFIX};
use crate::web::rest::{api_error, provider_status, ApiFailure};
use crate::web::state::AppState;

/// Length of the random suffix appended to the access-cookie prefix.
const ACCESS_COOKIE_SUFFIX_LEN: usize = 69;
const ACCESS_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheckResponse {
    pub has_access: bool,
}

#[derive(Serialize, ToSchema)]
pub struct GrantAccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/payment/check-access - Report whether the caller holds unlimited access
#[utoipa::path(
    get,
    path = "/api/payment/check-access",
    responses(
        (status = 200, description = "Access status derived from the request cookies", body = AccessCheckResponse)
    )
)]
pub async fn check_access_handler(headers: HeaderMap) -> Json<AccessCheckResponse> {
    Json(AccessCheckResponse {
        has_access: has_unlimited_access(&headers),
    })
}

/// POST /api/payment/set-access-cookie - Grant unlimited access
#[utoipa::path(
    post,
    path = "/api/payment/set-access-cookie",
    responses(
        (status = 200, description = "Unlimited-access cookie set", body = GrantAccessResponse)
    )
)]
pub async fn grant_access_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiFailure> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_COOKIE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    let cookie_name = format!("{}{}", ACCESS_COOKIE_PREFIX, suffix);

    // HTTP-only cookie that expires in 1 year.
    let cookie = if state.config.secure_cookies {
        format!(
            "{}=true; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
            cookie_name, ACCESS_COOKIE_MAX_AGE_SECS
        )
    } else {
        format!(
            "{}=true; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            cookie_name, ACCESS_COOKIE_MAX_AGE_SECS
        )
    };

    info!("Access cookie set: {}", cookie_name);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(GrantAccessResponse {
            success: true,
            message: "Unlimited access granted".to_string(),
        }),
    ))
}

/// POST /api/payment/create-checkout - Create a hosted checkout session
#[utoipa::path(
    post,
    path = "/api/payment/create-checkout",
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 500, description = "Payment provider not configured", body = crate::web::rest::ErrorBody)
    )
)]
pub async fn create_checkout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CheckoutResponse>, ApiFailure> {
    let Some(checkout) = state.checkout_adapter.as_ref() else {
        error!("Payment provider not configured");
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Payment system not configured",
        ));
    };

    // The provider sends the customer back to the page they came from.
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost:3000");
    let protocol = if host.contains("localhost") { "http" } else { "https" };
    let base_url = format!("{}://{}", protocol, host);

    let checkout_url = checkout.create_checkout(&base_url).await.map_err(|err| {
        error!("Error creating checkout session: {}", err);
        match err {
            PortError::Provider { status, message } => api_error(
                provider_status(status),
                format!("Payment API Error: {}", message),
            ),
            _ => api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create checkout session",
            ),
        }
    })?;

    Ok(Json(CheckoutResponse { checkout_url }))
}

/// POST /api/webhooks/payments - Receive signed payment provider events
pub async fn payment_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiFailure> {
    if body.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No body provided"));
    }

    if let Some(secret) = state.config.dodo_webhook_secret.as_deref() {
        let id = webhook_header(&headers, "webhook-id");
        let signature = webhook_header(&headers, "webhook-signature");
        let timestamp = webhook_header(&headers, "webhook-timestamp");
        let (Some(id), Some(signature), Some(timestamp)) = (id, signature, timestamp) else {
            error!("Missing webhook headers");
            return Err(api_error(StatusCode::BAD_REQUEST, "Missing webhook headers"));
        };

        if let Err(err) = verify_webhook_signature(secret, id, timestamp, &body, signature) {
            error!("Webhook verification failed: {}", err);
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "Webhook verification failed",
            ));
        }
        info!("Webhook verified successfully");
    } else {
        // Testing only: without a secret there is nothing to verify against.
        warn!("Webhook secret not configured - accepting webhook without verification");
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid webhook payload"))?;

    let event_type = payload
        .get("event_type")
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    info!("Webhook event type: {}", event_type);

    match event_type {
        "payment.completed" => {
            let data = payload.get("data");
            info!(
                "Processing completed payment: paymentId={}, customerId={}, amount={}",
                field(data, "payment_id"),
                field(data, "customer_id"),
                field(data, "amount"),
            );
        }
        "payment.failed" => warn!("Payment failed: {:?}", payload.get("data")),
        "payment.refunded" => warn!("Payment refunded: {:?}", payload.get("data")),
        other => info!("Unhandled webhook event: {}", other),
    }

    Ok(Json(WebhookResponse {
        success: true,
        message: "Webhook processed successfully".to_string(),
    }))
}

fn webhook_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn field(data: Option<&serde_json::Value>, key: &str) -> String {
    data.and_then(|d| d.get(key))
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

//=========================================================================================
// Webhook signature verification (standard-webhooks scheme)
//=========================================================================================

#[derive(Debug, thiserror::Error)]
#[error("webhook signature mismatch")]
pub struct SignatureError;

/// Verifies a standard-webhooks signature: base64 HMAC-SHA256 over
/// `"{id}.{timestamp}.{body}"`, sent as space-separated `v1,<base64>`
/// entries. Secrets are distributed as `whsec_<base64 key>`.
pub fn verify_webhook_signature(
    secret: &str,
    id: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
) -> Result<(), SignatureError> {
    let encoded_key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let key = BASE64.decode(encoded_key).map_err(|_| SignatureError)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(&key).map_err(|_| SignatureError)?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    let matched = signature_header.split_whitespace().any(|entry| {
        entry
            .strip_prefix("v1,")
            .is_some_and(|candidate| candidate == expected)
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError)
    }
}
