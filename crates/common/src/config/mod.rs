//! Configuration management for rSearch
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Conventional provider variables (SERPER_API_KEY, DEEPSEEK_API_KEY)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Search provider configuration
    #[serde(default)]
    pub search: SearchProviderConfig,

    /// Query refinement model configuration
    #[serde(default)]
    pub refiner: RefinerConfig,

    /// Reasoning (answer synthesis) model configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// User preferences applied to every session
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchProviderConfig {
    /// Serper API key; absence is a configuration error at request time
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefinerConfig {
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_refiner_model")]
    pub model: String,

    #[serde(default = "default_refiner_temperature")]
    pub temperature: f32,

    #[serde(default = "default_refiner_max_tokens")]
    pub max_tokens: u32,

    /// Whole-request timeout in seconds
    #[serde(default = "default_refiner_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Deadline for the response headers in seconds
    #[serde(default = "default_first_byte_timeout")]
    pub first_byte_timeout_secs: u64,

    /// Maximum silence between two body reads in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

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

/// Preferences that used to live in browser storage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Preferences {
    #[serde(default = "default_ai_provider")]
    pub ai_provider: String,

    #[serde(default = "default_search_provider")]
    pub search_provider: String,

    /// Whether refinement, sources and reasoning sections start expanded
    #[serde(default = "default_enabled")]
    pub auto_expand_sections: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_search_base_url() -> String { "https://google.serper.dev".to_string() }
fn default_search_timeout() -> u64 { 15 }
fn default_llm_base_url() -> String { "https://api.deepseek.com".to_string() }
fn default_refiner_model() -> String { "deepseek-chat".to_string() }
fn default_refiner_temperature() -> f32 { 0.6 }
fn default_refiner_max_tokens() -> u32 { 500 }
fn default_refiner_timeout() -> u64 { 30 }
fn default_reasoning_model() -> String { "deepseek-reasoner".to_string() }
fn default_connect_timeout() -> u64 { 10 }
fn default_first_byte_timeout() -> u64 { 60 }
fn default_idle_timeout() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "rsearch".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }
fn default_ai_provider() -> String { "deepseek".to_string() }
fn default_search_provider() -> String { "serper".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let llm_key = std::env::var("DEEPSEEK_API_KEY").ok();

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("search.api_key", std::env::var("SERPER_API_KEY").ok())?
            .set_override_option("refiner.api_key", llm_key.clone())?
            .set_override_option("reasoning.api_key", llm_key)?
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Timeout for fetching result pages, shared with the search provider
    pub fn page_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for SearchProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_base_url(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_refiner_model(),
            temperature: default_refiner_temperature(),
            max_tokens: default_refiner_max_tokens(),
            timeout_secs: default_refiner_timeout(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_reasoning_model(),
            connect_timeout_secs: default_connect_timeout(),
            first_byte_timeout_secs: default_first_byte_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
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

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ai_provider: default_ai_provider(),
            search_provider: default_search_provider(),
            auto_expand_sections: default_enabled(),
        }
    }
}
