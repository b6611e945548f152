//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub poem_model: String,
    pub vision_model: String,
    /// Mark access cookies `Secure`; enabled in production deployments.
    pub secure_cookies: bool,
    pub dodo_payments_api_key: Option<String>,
    pub dodo_product_id: Option<String>,
    pub dodo_webhook_secret: Option<String>,
    /// Live mode hits the real payment environment; off means test mode.
    pub dodo_live_mode: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let dodo_payments_api_key = std::env::var("DODO_PAYMENTS_API_KEY").ok();
        let dodo_product_id = std::env::var("DODO_PRODUCT_ID").ok();
        let dodo_webhook_secret = std::env::var("DODO_WEBHOOK_SECRET").ok();

        // --- Load Adapter-specific Settings ---
        let poem_model =
            std::env::var("POEM_MODEL").unwrap_or_else(|_| "gpt-5-mini".to_string());
        let vision_model =
            std::env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());

        let secure_cookies = flag_from_env("SECURE_COOKIES")?;
        let dodo_live_mode = flag_from_env("DODO_LIVE_MODE")?;

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            openai_api_key,
            poem_model,
            vision_model,
            secure_cookies,
            dodo_payments_api_key,
            dodo_product_id,
            dodo_webhook_secret,
            dodo_live_mode,
        })
    }
}

/// Parses an optional boolean flag; absent means `false`.
fn flag_from_env(name: &str) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(false),
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a boolean", other),
            )),
        },
    }
}
