//! crates/sintgpt_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like model providers
//! or rasterization libraries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::path::Path;
use std::pin::Pin;

use crate::domain::{DocumentAnalysis, RateLimitRecord, TokenUsage};
use crate::throttle::{AdmitDecision, RateLimitPolicy};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The caller handed the port something it cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The upstream provider answered with an error; status and message are
    /// passed through to the HTTP boundary.
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    /// The provider answered, but not in the agreed shape.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Streaming generation
//=========================================================================================

/// One element of a relayed generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoemChunk {
    /// An incremental fragment of generated poem text.
    Delta(String),
    /// Terminal marker, carrying the provider-reported token usage when the
    /// provider included it.
    Done { usage: Option<TokenUsage> },
}

pub type PoemStream = Pin<Box<dyn Stream<Item = PortResult<PoemChunk>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait PoemGenerationService: Send + Sync {
    /// Starts one streaming generation call for the assembled prompt.
    /// Failing to establish the stream is reported here; failures after the
    /// first chunk surface as stream items.
    async fn stream_poem(&self, prompt: &str) -> PortResult<PoemStream>;
}

#[async_trait]
pub trait DocumentExtractionService: Send + Sync {
    /// Runs one structured-extraction call over a single page image and
    /// returns the validated analysis with its token usage.
    async fn analyze_page(
        &self,
        image: &[u8],
        mime: &str,
        page_number: u32,
        total_pages: u32,
    ) -> PortResult<(DocumentAnalysis, TokenUsage)>;
}

#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Renders every page of the PDF at `path` to a PNG image, in page order.
    async fn rasterize_pdf(&self, path: &Path) -> PortResult<Vec<Vec<u8>>>;
}

#[async_trait]
pub trait ThrottleStore: Send + Sync {
    /// Returns the current rate-limit record for `key`, if one exists.
    async fn get(&self, key: &str) -> Option<RateLimitRecord>;

    /// Runs the admission decision for `key` and, when admitted, commits the
    /// new counter value and debounce timestamp. Check and commit must be
    /// atomic per key: two concurrent requests from one client must never
    /// both be admitted under the same counter value.
    async fn try_admit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> AdmitDecision;

    /// Evicts entries whose window and debounce horizon have both passed.
    async fn sweep(&self, now: DateTime<Utc>);
}

#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Creates a hosted checkout session with the payment provider and
    /// returns its redirect URL. `return_base_url` is the origin the
    /// provider sends the customer back to.
    async fn create_checkout(&self, return_base_url: &str) -> PortResult<String>;
}
