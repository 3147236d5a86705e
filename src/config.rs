//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and cached in memory; deployment is
//! expected to inject them as environment variables.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Service endpoints ---
    /// Identity provider base URL (session/account/federated endpoints)
    pub identity_base_url: String,
    /// Row store base URL (PostgREST-style row CRUD)
    pub store_base_url: String,
    /// Frontend URL for federated sign-in redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Identity provider publishable API key
    pub identity_api_key: String,
    /// Row store service key (sent as both apikey and bearer)
    pub store_service_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for signing federated sign-in state
    pub oauth_state_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            identity_base_url: "http://localhost:9999".to_string(),
            store_base_url: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            identity_api_key: "test_identity_key".to_string(),
            store_service_key: "test_store_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .map_err(|_| ConfigError::Missing("IDENTITY_BASE_URL"))?,
            store_base_url: env::var("STORE_BASE_URL")
                .map_err(|_| ConfigError::Missing("STORE_BASE_URL"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            store_service_key: env::var("STORE_SERVICE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STORE_SERVICE_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
