//! services/api/src/web/poem.rs
//!
//! The poem-generation endpoint: validation, throttle admission, prompt
//! construction, and the streaming relay of the provider's token stream.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::{Stream, StreamExt};
use sintgpt_core::{
    cost::{format_dollars, POEM_RATES},
    domain::PoemRequest,
    ports::{PoemChunk, PortError},
    prompt::build_poem_prompt,
    throttle::AdmitDecision,
};
use tracing::{error, info, warn};

use crate::adapters::is_overloaded;
use crate::web::client::{client_ip, has_unlimited_access};
use crate::web::protocol::{StreamEvent, STREAM_DONE_SENTINEL};
use crate::web::rest::{api_error, api_error_with_data, provider_status, ApiFailure};
use crate::web::state::AppState;

/// POST /api/poem/generate
///
/// Validates the request, enforces the debounce window and the per-client
/// rate limit (both skipped for unlimited-access holders), then relays the
/// generation stream as SSE. Every rejection happens before the provider
/// is contacted.
pub async fn generate_poem_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<PoemRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiFailure> {
    if let Err(field_errors) = request.validate() {
        warn!("Rejected invalid poem request: {:?}", field_errors);
        return Err(api_error_with_data(
            StatusCode::BAD_REQUEST,
            "Invalid request data",
            serde_json::json!({ "errors": field_errors }),
        ));
    }

    let ip = client_ip(&headers, peer);
    if !has_unlimited_access(&headers) {
        match state.throttle.try_admit(&ip, &state.rate_limit, Utc::now()).await {
            AdmitDecision::Admitted { record } => {
                info!(
                    "Poem request admitted for {} ({} of {} in window)",
                    ip, record.count, state.rate_limit.max_requests
                );
            }
            AdmitDecision::TooSoon { retry_after_secs } => {
                warn!("Debounce rejection for {}", ip);
                let unit = if retry_after_secs == 1 { "seconde" } else { "seconden" };
                return Err(api_error(
                    StatusCode::TOO_MANY_REQUESTS,
                    format!(
                        "Je gaat te snel. Probeer het over {} {} opnieuw.",
                        retry_after_secs, unit
                    ),
                ));
            }
            AdmitDecision::LimitReached { hours_remaining } => {
                warn!("Rate limit exceeded for IP: {}", ip);
                return Err(api_error(
                    StatusCode::TOO_MANY_REQUESTS,
                    format!(
                        "Je kunt maar {} gedichten per dag genereren. Probeer het over {} uur opnieuw.",
                        state.rate_limit.max_requests, hours_remaining
                    ),
                ));
            }
        }
    } else {
        info!("Unlimited-access cookie present, skipping throttle for {}", ip);
    }

    info!(
        "Generating poem with parameters: name={}, style={:?}, rhymeScheme={:?}, lines={}, language={:?}, hasFunFacts={}",
        request.name,
        request.style,
        request.rhyme_scheme,
        request.lines,
        request.language,
        request.fun_facts.is_some(),
    );

    let prompt = build_poem_prompt(&request);

    // Retry applies to establishing the stream; the transient-overload
    // classifier decides what is worth retrying.
    let adapter = state.poem_adapter.clone();
    let upstream = state
        .retry
        .run(
            || {
                let adapter = adapter.clone();
                let prompt = prompt.clone();
                async move { adapter.stream_poem(&prompt).await }
            },
            is_overloaded,
        )
        .await
        .map_err(|err| {
            error!("Error generating poem: {}", err);
            match err {
                PortError::Provider { status, message } => api_error(
                    provider_status(status),
                    format!("AI API Error: {}", message),
                ),
                other => api_error_with_data(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate poem",
                    serde_json::json!({ "originalError": other.to_string() }),
                ),
            }
        })?;

    // Relay each text delta as it arrives; a dropped client simply drops
    // this stream, and the provider stream with it.
    let sse_stream = async_stream::stream! {
        let mut upstream = upstream;
        while let Some(item) = upstream.next().await {
            match item {
                Ok(PoemChunk::Delta(delta)) => {
                    yield Ok(event(&StreamEvent::TextDelta { delta }));
                }
                Ok(PoemChunk::Done { usage }) => {
                    if let Some(usage) = usage {
                        let cost = POEM_RATES.estimate(&usage);
                        info!(
                            "Poem generated. Token usage: input={}, output={}, reasoning={}, estimated cost={}",
                            usage.prompt_tokens,
                            usage.completion_tokens,
                            usage.reasoning_tokens.unwrap_or(0),
                            format_dollars(cost.total()),
                        );
                    } else {
                        info!("Poem generated; provider reported no usage");
                    }
                    yield Ok(event(&StreamEvent::Finish));
                    yield Ok(Event::default().data(STREAM_DONE_SENTINEL));
                    return;
                }
                Err(err) => {
                    error!("Poem stream failed mid-flight: {}", err);
                    yield Ok(event(&StreamEvent::Error { message: err.to_string() }));
                    yield Ok(Event::default().data(STREAM_DONE_SENTINEL));
                    return;
                }
            }
        }
        // Provider ended the stream without a terminal chunk; close the
        // relay cleanly anyway.
        yield Ok(event(&StreamEvent::Finish));
        yield Ok(Event::default().data(STREAM_DONE_SENTINEL));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

fn event(payload: &StreamEvent) -> Event {
    // StreamEvent serialization cannot fail; fall back to an empty object
    // rather than panicking inside the relay loop.
    Event::default().data(serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testutil::{sse_request, test_app, MockPoemAdapter};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn poem_body(lines: u32) -> String {
        format!(
            r#"{{"name":"Sanne","style":"funny","rhymeScheme":"AABB","lines":{},"language":"dutch"}}"#,
            lines
        )
    }

    #[tokio::test]
    async fn streams_text_deltas_and_the_done_sentinel() {
        let poem = MockPoemAdapter::with_deltas(&["Daar ", "komt ", "de ", "Sint"]);
        let calls = poem.calls.clone();
        let app = test_app(|state| state.poem_adapter = Arc::new(poem));

        let response = app
            .oneshot(sse_request(&poem_body(12), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"{"type":"text-delta","delta":"Daar "}"#));
        assert!(text.contains(r#"{"type":"finish"}"#));
        assert!(text.contains(STREAM_DONE_SENTINEL));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_out_of_range_lines_before_calling_the_provider() {
        let poem = MockPoemAdapter::with_deltas(&["never"]);
        let calls = poem.calls.clone();
        let app = test_app(|state| state.poem_adapter = Arc::new(poem));

        for lines in [7, 41] {
            let response = app
                .clone()
                .oneshot(sse_request(&poem_body(lines), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_immediate_request_is_debounced() {
        let app = test_app(|_| {});

        let first = app
            .clone()
            .oneshot(sse_request(&poem_body(12), None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(sse_request(&poem_body(12), None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = second.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Je gaat te snel"));
    }

    #[tokio::test]
    async fn access_cookie_bypasses_debounce_and_rate_limit() {
        let app = test_app(|_| {});
        let cookie = Some("sintgpt-abc123=true");

        // Four back-to-back requests: all admitted with the cookie.
        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(sse_request(&poem_body(12), cookie))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_without_provider_calls() {
        let poem = MockPoemAdapter::with_deltas(&["never"]);
        let calls = poem.calls.clone();
        let app = test_app(|state| state.poem_adapter = Arc::new(poem));

        let request = Request::builder()
            .method("POST")
            .uri("/api/poem/generate")
            .header("content-type", "application/json")
            .extension(axum::extract::ConnectInfo(
                "127.0.0.1:9999".parse::<SocketAddr>().unwrap(),
            ))
            .body(Body::from(r#"{"name":"x","style":"unknown-style"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
