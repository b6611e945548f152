//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DodoCheckoutAdapter, InMemoryThrottleStore, OpenAiPoemAdapter, OpenAiVisionAdapter,
        PdfiumRasterizer, RetryPolicy,
    },
    config::Config,
    error::ApiError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use chrono::Utc;
use sintgpt_core::{ports::CheckoutService, throttle::RateLimitPolicy};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let poem_adapter = Arc::new(OpenAiPoemAdapter::new(
        openai_client.clone(),
        config.poem_model.clone(),
    ));
    let vision_adapter = Arc::new(OpenAiVisionAdapter::new(
        openai_client.clone(),
        config.vision_model.clone(),
    ));
    let rasterizer = Arc::new(PdfiumRasterizer::new());
    let throttle = Arc::new(InMemoryThrottleStore::new());

    let checkout_adapter = match (&config.dodo_payments_api_key, &config.dodo_product_id) {
        (Some(api_key), Some(product_id)) => Some(Arc::new(DodoCheckoutAdapter::new(
            api_key.clone(),
            product_id.clone(),
            config.dodo_live_mode,
        )) as Arc<dyn CheckoutService>),
        _ => {
            warn!("Payment provider not configured; checkout creation will be rejected");
            None
        }
    };

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        poem_adapter,
        extraction_adapter: vision_adapter,
        rasterizer,
        throttle,
        checkout_adapter,
        rate_limit: RateLimitPolicy::default(),
        retry: RetryPolicy::default(),
    });

    // --- 4. Spawn the Throttle Sweep ---
    // Evicts stale per-client entries so the in-memory maps stay bounded.
    let sweep_store = app_state.throttle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            ticker.tick().await;
            sweep_store.sweep(Utc::now()).await;
        }
    });

    // --- 5. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let routes = api_router(app_state)
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
