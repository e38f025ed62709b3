//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `SENTINEL_CONFIG` env var
//! 3. **Environment variables**: `SENTINEL__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP listener settings
//! - [`DatabaseConfig`]: `SQLite` location, pool size, and per-query deadline
//! - [`LimiterConfig`]: Per-client request rate and burst
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! environment = "production"
//!
//! [server]
//! bind_port = 4000
//!
//! [database]
//! url = "sqlite://db/sentinel.db"
//!
//! [limiter]
//! requests_per_second = 2.0
//! burst = 4
//! enabled = true
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `0.0.0.0`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `4000`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Whole-request timeout in seconds. Defaults to `30`.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    4000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` database URL. Defaults to `sqlite://db/sentinel.db`.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections. Defaults to `5`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Deadline for a single statement in seconds. Defaults to `3`.
    #[serde(default = "default_query_timeout_seconds")]
    pub query_timeout_seconds: u64,
}

fn default_database_url() -> String {
    "sqlite://db/sentinel.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_query_timeout_seconds() -> u64 {
    3
}

/// Per-client admission control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Sustained requests per second per client. Defaults to `2.0`.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Bucket capacity, i.e. the largest burst a client may send at once. Defaults to `4`.
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// When `false`, every request is admitted. Defaults to `true`.
    #[serde(default = "default_limiter_enabled")]
    pub enabled: bool,
}

fn default_requests_per_second() -> f64 {
    2.0
}

fn default_burst() -> u32 {
    4
}

fn default_limiter_enabled() -> bool {
    true
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded with the `SENTINEL` prefix for environment overrides using `__` as a separator,
/// e.g. `SENTINEL__LIMITER__BURST=10`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (e.g., "development", "production"). Defaults to `"development"`.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub limiter: LimiterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            query_timeout_seconds: default_query_timeout_seconds(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            enabled: default_limiter_enabled(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            limiter: LimiterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("environment", "development")?
            .set_default("server.bind_address", "0.0.0.0")?
            .set_default("server.bind_port", 4000)?
            .set_default("server.request_timeout_seconds", 30)?
            .set_default("database.url", "sqlite://db/sentinel.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.query_timeout_seconds", 3)?
            .set_default("limiter.requests_per_second", 2.0)?
            .set_default("limiter.burst", 4)?
            .set_default("limiter.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("SENTINEL").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `SENTINEL_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed into a valid [`SocketAddr`].
    ///
    /// [`SocketAddr`]: std::net::SocketAddr
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.database.query_timeout_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.database.url.is_empty() {
            return Err("Database URL must not be empty".to_string());
        }

        if self.database.max_connections == 0 {
            return Err("Database max connections must be greater than 0".to_string());
        }

        if self.database.query_timeout_seconds == 0 {
            return Err("Database query timeout must be greater than 0".to_string());
        }

        if !self.limiter.requests_per_second.is_finite() || self.limiter.requests_per_second <= 0.0
        {
            return Err("Limiter requests per second must be a positive number".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
