//! Configuration management for CardForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Proposal generator configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Content length policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// List endpoint paging defaults
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds; must exceed the generator timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply embedded migrations on startup
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Generator provider: openrouter, mock
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Hard limit on one generator call, in seconds
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,

    /// Proposals beyond this count are dropped
    #[serde(default = "default_max_proposals")]
    pub max_proposals: usize,

    /// Sampling temperature passed to the provider
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Minimum source text length, in characters
    #[serde(default = "default_source_text_min")]
    pub source_text_min_chars: usize,

    /// Maximum source text length, in characters
    #[serde(default = "default_source_text_max")]
    pub source_text_max_chars: usize,

    /// Maximum flashcard front length, in characters
    #[serde(default = "default_front_max")]
    pub front_max_chars: usize,

    /// Maximum flashcard back length, in characters
    #[serde(default = "default_back_max")]
    pub back_max_chars: usize,

    /// Whether flashcards with AI provenance may be edited after acceptance
    #[serde(default = "default_enabled")]
    pub allow_editing_generated_flashcards: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    /// Page size used when the client sends none
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,

    /// Largest page size a client may request
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 90 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 100 }
fn default_database_url() -> String { "postgres://localhost/cardforge".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_generator_provider() -> String { "openrouter".to_string() }
fn default_generator_model() -> String { "openai/gpt-4o-mini".to_string() }
fn default_generator_timeout() -> u64 { 60 }
fn default_max_proposals() -> usize { 20 }
fn default_temperature() -> f32 { 0.3 }
fn default_source_text_min() -> usize { 1000 }
fn default_source_text_max() -> usize { 10000 }
fn default_front_max() -> usize { 200 }
fn default_back_max() -> usize { 500 }
fn default_page_limit() -> u64 { 10 }
fn default_max_page_limit() -> u64 { 100 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "cardforge".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__GENERATOR__TIMEOUT_SECS=30
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the service misbehave at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.policy;
        if policy.source_text_min_chars > policy.source_text_max_chars {
            return Err(ConfigError::Message(format!(
                "policy.source_text_min_chars ({}) exceeds policy.source_text_max_chars ({})",
                policy.source_text_min_chars, policy.source_text_max_chars
            )));
        }
        if policy.front_max_chars == 0 || policy.back_max_chars == 0 {
            return Err(ConfigError::Message(
                "policy.front_max_chars and policy.back_max_chars must be positive".to_string(),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ConfigError::Message(format!(
                "pagination.default_limit must be within 1..={}",
                self.pagination.max_limit
            )));
        }
        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0)
        {
            return Err(ConfigError::Message(
                "rate_limit.requests_per_second and rate_limit.burst must be positive".to_string(),
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "generator.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the generator call timeout as Duration
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_enabled(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            api_key: None,
            api_base: None,
            model: default_generator_model(),
            timeout_secs: default_generator_timeout(),
            max_proposals: default_max_proposals(),
            temperature: default_temperature(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            source_text_min_chars: default_source_text_min(),
            source_text_max_chars: default_source_text_max(),
            front_max_chars: default_front_max(),
            back_max_chars: default_back_max(),
            allow_editing_generated_flashcards: default_enabled(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            generator: GeneratorConfig::default(),
            policy: PolicyConfig::default(),
            pagination: PaginationConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.policy.source_text_min_chars, 1000);
        assert_eq!(config.policy.source_text_max_chars, 10000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/cardforge");
    }

    #[test]
    fn test_inverted_source_bounds_rejected() {
        let mut config = AppConfig::default();
        config.policy.source_text_min_chars = 500;
        config.policy.source_text_max_chars = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_limit_above_max_rejected() {
        let mut config = AppConfig::default();
        config.pagination.default_limit = 500;
        assert!(config.validate().is_err());
    }
}
