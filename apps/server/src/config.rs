//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Only the checkout API key is required.

use serde::{Deserialize, Serialize};
use std::env;

/// Campus Market server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Base URL of the hosted checkout API
    pub checkout_base_url: String,

    /// API key for the hosted checkout API
    pub checkout_api_key: String,

    /// Public base URL of this deployment, used to build the
    /// success/cancel redirect URLs handed to the processor
    pub public_base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "market.db".to_string()),

            checkout_base_url: env::var("CHECKOUT_BASE_URL")
                .unwrap_or_else(|_| "https://checkout.example.com/v1".to_string()),

            checkout_api_key: env::var("CHECKOUT_API_KEY")
                .map_err(|_| ConfigError::MissingRequired("CHECKOUT_API_KEY".to_string()))?,

            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        };

        Ok(config)
    }

    /// Redirect URL the processor sends a payer back to after success.
    /// The processor substitutes its session ID into the placeholder.
    pub fn success_url(&self) -> String {
        format!(
            "{}/payment-result?session_id={{CHECKOUT_SESSION_ID}}",
            self.public_base_url
        )
    }

    /// Redirect URL for an abandoned checkout.
    pub fn cancel_url(&self) -> String {
        format!("{}/payment-cancelled", self.public_base_url)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
