//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::RetryPolicy;
use crate::config::Config;
use sintgpt_core::{
    ports::{
        CheckoutService, DocumentExtractionService, PageRasterizer, PoemGenerationService,
        ThrottleStore,
    },
    throttle::RateLimitPolicy,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub poem_adapter: Arc<dyn PoemGenerationService>,
    pub extraction_adapter: Arc<dyn DocumentExtractionService>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub throttle: Arc<dyn ThrottleStore>,
    /// Absent when the payment provider is not configured; the checkout
    /// endpoint reports that instead of failing at startup.
    pub checkout_adapter: Option<Arc<dyn CheckoutService>>,
    pub rate_limit: RateLimitPolicy,
    pub retry: RetryPolicy,
}
