//! services/api/src/web/rest.rs
//!
//! Shared REST plumbing: the JSON error body used by every handler and the
//! master definition for the OpenAPI specification.

use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::payment::{AccessCheckResponse, CheckoutResponse, GrantAccessResponse};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::payment::check_access_handler,
        crate::web::payment::grant_access_handler,
        crate::web::payment::create_checkout_handler,
    ),
    components(
        schemas(AccessCheckResponse, GrantAccessResponse, CheckoutResponse, ErrorBody)
    ),
    tags(
        (name = "SintGPT API", description = "API endpoints for poem generation, document analysis and the unlock flow.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Responses
//=========================================================================================

/// The JSON body of every non-streaming error response.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_message: String,
    /// Optional diagnostic detail, e.g. field-level validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<serde_json::Value>,
}

/// The failure type shared by all handlers.
pub type ApiFailure = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ErrorBody {
            status_message: message.into(),
            data: None,
        }),
    )
}

pub fn api_error_with_data(
    status: StatusCode,
    message: impl Into<String>,
    data: serde_json::Value,
) -> ApiFailure {
    (
        status,
        Json(ErrorBody {
            status_message: message.into(),
            data: Some(data),
        }),
    )
}

/// Converts a provider status passthrough into a response status, falling
/// back to 502 for values that are not valid HTTP statuses.
pub fn provider_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}
