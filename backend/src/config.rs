//! Configuration management for the AgroX farm advisory service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with AGROX_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Generative model configuration
    pub gemini: GeminiConfig,

    /// Weather and soil provider configuration
    pub open_meteo: OpenMeteoConfig,

    /// Voice callback vendor configuration
    pub vapi: VapiConfig,

    /// Signup forwarding configuration
    pub registration: RegistrationConfig,

    /// Dashboard behaviour
    pub dashboard: DashboardConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; empty keeps accounts in memory
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,

    /// API root, e.g. https://generativelanguage.googleapis.com/v1beta
    pub base_url: String,

    /// Model id used for every request
    pub model: String,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenMeteoConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VapiConfig {
    pub api_key: String,
    pub base_url: String,
    pub assistant_id: String,
    pub phone_number_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    /// Webhook receiving new-user payloads; empty disables forwarding
    pub webhook_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    /// Images kept per selection (at most 3)
    pub max_images: usize,

    /// Seconds the callback status banner stays visible
    pub callback_banner_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AGROX_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.secret", "development-secret-key")?
            .set_default("jwt.access_token_expiry", 86400)?
            .set_default("gemini.api_key", "")?
            .set_default(
                "gemini.base_url",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("gemini.model", "gemini-2.5-flash")?
            .set_default("gemini.timeout_secs", 60)?
            .set_default("open_meteo.base_url", "https://api.open-meteo.com/v1")?
            .set_default("vapi.api_key", "")?
            .set_default("vapi.base_url", "https://api.vapi.ai")?
            .set_default("vapi.assistant_id", "")?
            .set_default("vapi.phone_number_id", "")?
            .set_default("registration.webhook_url", "")?
            .set_default("dashboard.max_images", 3)?
            .set_default("dashboard.callback_banner_secs", 5)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AGROX_ prefix)
            .add_source(
                Environment::with_prefix("AGROX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn uses_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }
}
