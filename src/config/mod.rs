//! Configuration management for signon-gate
//!
//! This module handles loading, parsing, and validating application
//! configuration from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::ratelimit;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// API key configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Rate limit configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from environment variables with prefix SIGNON_GATE_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(host) = std::env::var("SIGNON_GATE_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("SIGNON_GATE_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid port number".to_string()))?;
        }

        if let Ok(path) = std::env::var("SIGNON_GATE_DATABASE_PATH") {
            config.database.path = path;
        }

        if let Ok(token) = std::env::var("SIGNON_GATE_BOOTSTRAP_KEY") {
            config.auth.bootstrap_key = Some(token);
        }
        if let Ok(dir) = std::env::var("SIGNON_GATE_CREDENTIALS_DIRECTORY") {
            config.auth.credentials_directory = Some(dir);
        }

        if let Ok(origins) = std::env::var("SIGNON_GATE_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(rate) = std::env::var("SIGNON_GATE_RATE_LIMIT_PER_SECOND") {
            config.rate_limit.per_second = rate
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid rate limit rate".to_string()))?;
        }
        if let Ok(burst) = std::env::var("SIGNON_GATE_RATE_LIMIT_BURST") {
            config.rate_limit.burst = burst
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid rate limit burst".to_string()))?;
        }
        if let Ok(max) = std::env::var("SIGNON_GATE_RATE_LIMIT_MAX_CLIENTS") {
            config.rate_limit.max_clients = max
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid rate limit client cap".to_string()))?;
        }
        if let Ok(idle) = std::env::var("SIGNON_GATE_RATE_LIMIT_IDLE_TIMEOUT_SECS") {
            config.rate_limit.idle_timeout_secs = idle
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid rate limit idle timeout".to_string()))?;
        }

        if let Ok(level) = std::env::var("SIGNON_GATE_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Resolve the bootstrap token, preferring the explicit config value
    /// over a credentials file (systemd `LoadCredential` style: a file
    /// named `api_key` inside the credentials directory).
    pub fn bootstrap_token(&self) -> Option<String> {
        if let Some(token) = &self.auth.bootstrap_key {
            return Some(token.clone());
        }

        let dir = self.auth.credentials_directory.as_ref()?;
        let path = Path::new(dir).join("api_key");
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// One-time bootstrap token in `id.secret` form
    #[serde(default)]
    pub bootstrap_key: Option<String>,

    /// Directory holding an `api_key` credentials file
    #[serde(default)]
    pub credentials_directory: Option<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorsConfig {
    /// Origins seeded into the whitelist on first startup
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Token refill rate per second
    #[serde(default = "default_per_second")]
    pub per_second: f64,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Maximum number of tracked client IPs
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Seconds a bucket may sit idle before eviction
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst: default_burst(),
            max_clients: default_max_clients(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl From<&RateLimitConfig> for ratelimit::RateLimitConfig {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            per_second: config.per_second,
            burst: config.burst,
            max_clients: config.max_clients,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "signon-gate.db".to_string()
}

fn default_per_second() -> f64 {
    10.0
}

fn default_burst() -> u32 {
    20
}

fn default_max_clients() -> usize {
    10_000
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Expand `${VAR}` references in a YAML string from the environment
///
/// Unset variables expand to an empty string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                result.push_str(&std::env::var(var).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}
