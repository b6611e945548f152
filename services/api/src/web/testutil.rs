//! services/api/src/web/testutil.rs
//!
//! Mock port implementations and request builders shared by the handler
//! tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::Router;
use sintgpt_core::{
    domain::{DocumentAnalysis, Sentiment, SentimentAnalysis, TokenUsage},
    ports::{
        CheckoutService, DocumentExtractionService, PageRasterizer, PoemChunk,
        PoemGenerationService, PoemStream, PortError, PortResult,
    },
    throttle::RateLimitPolicy,
};

use crate::adapters::{InMemoryThrottleStore, RetryPolicy};
use crate::config::Config;
use crate::web::{api_router, state::AppState};

/// A poem adapter that streams canned deltas and counts invocations.
pub struct MockPoemAdapter {
    pub calls: Arc<AtomicUsize>,
    deltas: Vec<String>,
}

impl MockPoemAdapter {
    pub fn with_deltas(deltas: &[&str]) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            deltas: deltas.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl PoemGenerationService for MockPoemAdapter {
    async fn stream_poem(&self, _prompt: &str) -> PortResult<PoemStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut chunks: Vec<PortResult<PoemChunk>> = self
            .deltas
            .iter()
            .cloned()
            .map(|delta| Ok(PoemChunk::Delta(delta)))
            .collect();
        chunks.push(Ok(PoemChunk::Done {
            usage: Some(TokenUsage {
                prompt_tokens: 200,
                completion_tokens: 80,
                reasoning_tokens: Some(40),
            }),
        }));
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// An extraction adapter returning a minimal fixed analysis per page,
/// optionally failing on one page number.
pub struct MockExtractionAdapter {
    pub calls: Arc<AtomicUsize>,
    failing_page: Option<u32>,
}

impl MockExtractionAdapter {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failing_page: None,
        }
    }

    pub fn failing_on_page(page: u32) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failing_page: Some(page),
        }
    }
}

fn canned_analysis(page_number: u32) -> DocumentAnalysis {
    DocumentAnalysis {
        transcription: format!("Transcription of page {}", page_number),
        named_entities: Vec::new(),
        timeline: Vec::new(),
        topic_tags: vec!["test".to_string()],
        sentiment_analysis: SentimentAnalysis {
            sentiment: Sentiment::Neutral,
            emotions: None,
            confidence: 0.5,
        },
        vocabulary: Vec::new(),
        locations: Vec::new(),
    }
}

#[async_trait]
impl DocumentExtractionService for MockExtractionAdapter {
    async fn analyze_page(
        &self,
        _image: &[u8],
        _mime: &str,
        page_number: u32,
        _total_pages: u32,
    ) -> PortResult<(DocumentAnalysis, TokenUsage)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_page == Some(page_number) {
            return Err(PortError::MalformedResponse(
                "mock schema mismatch".to_string(),
            ));
        }
        Ok((
            canned_analysis(page_number),
            TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 10,
                reasoning_tokens: None,
            },
        ))
    }
}

/// A rasterizer producing `pages` fake PNG buffers without touching pdfium.
pub struct MockRasterizer {
    pub pages: usize,
}

#[async_trait]
impl PageRasterizer for MockRasterizer {
    async fn rasterize_pdf(&self, _path: &Path) -> PortResult<Vec<Vec<u8>>> {
        Ok((0..self.pages)
            .map(|index| format!("png-page-{}", index + 1).into_bytes())
            .collect())
    }
}

pub struct MockCheckout;

#[async_trait]
impl CheckoutService for MockCheckout {
    async fn create_checkout(&self, return_base_url: &str) -> PortResult<String> {
        Ok(format!("{}/checkout/session-test", return_base_url))
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        openai_api_key: None,
        poem_model: "test-poem-model".to_string(),
        vision_model: "test-vision-model".to_string(),
        secure_cookies: false,
        dodo_payments_api_key: None,
        dodo_product_id: None,
        dodo_webhook_secret: None,
        dodo_live_mode: false,
    }
}

/// Builds a router over a default mock state, letting the caller swap
/// individual ports before the state is frozen.
pub fn test_app(customize: impl FnOnce(&mut AppState)) -> Router {
    let mut state = AppState {
        config: Arc::new(test_config()),
        poem_adapter: Arc::new(MockPoemAdapter::with_deltas(&["test "])),
        extraction_adapter: Arc::new(MockExtractionAdapter::new()),
        rasterizer: Arc::new(MockRasterizer { pages: 1 }),
        throttle: Arc::new(InMemoryThrottleStore::new()),
        checkout_adapter: Some(Arc::new(MockCheckout)),
        rate_limit: RateLimitPolicy::default(),
        retry: RetryPolicy {
            max_attempts: 1,
            delay: std::time::Duration::from_millis(1),
        },
    };
    customize(&mut state);
    api_router(Arc::new(state))
}

/// A poem-generation request with an optional cookie header. The peer
/// address extension stands in for the real connection info.
pub fn sse_request(json_body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/poem/generate")
        .header("content-type", "application/json")
        .extension(ConnectInfo("127.0.0.1:9999".parse::<SocketAddr>().unwrap()));
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(json_body.to_string())).unwrap()
}

/// A multipart upload carrying one `image` field of the given type.
pub fn multipart_request(content_type: &str, payload: &[u8]) -> Request<Body> {
    let boundary = "test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"document\"\r\nContent-Type: {}\r\n\r\n",
            content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/ocr/image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}
