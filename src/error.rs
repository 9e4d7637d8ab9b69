//! Application error types for signon-gate
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.
//!
//! Policy rejections (bad token, disallowed origin, exhausted rate limit)
//! are expected outcomes of normal operation and are represented as plain
//! boolean results or dedicated response types, not as these errors.

use thiserror::Error;

/// API key related errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token or bootstrap input is not in the `id.secret` format
    #[error("Invalid API key format")]
    InvalidKeyFormat,

    /// Key id not found in the store
    #[error("API key not found")]
    KeyNotFound,

    /// Underlying persistence failure
    #[error("Key storage failure: {0}")]
    Storage(#[from] DbError),
}

/// CORS whitelist errors
#[derive(Debug, Error)]
pub enum CorsError {
    /// Origin was empty after trimming
    #[error("Origin cannot be empty")]
    EmptyOrigin,

    /// Origin not present in the whitelist
    #[error("CORS origin not found")]
    OriginNotFound,

    /// Underlying persistence failure
    #[error("Origin storage failure: {0}")]
    Storage(#[from] DbError),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Async connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    /// Failed to parse configuration content
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Application-level error type
///
/// Aggregates the domain-specific error types for callers that need a
/// single error surface (mainly `main` and the server bootstrap path).
#[derive(Debug, Error)]
pub enum AppError {
    /// API key error
    #[error("API key error: {0}")]
    Auth(#[from] AuthError),

    /// CORS error
    #[error("CORS error: {0}")]
    Cors(#[from] CorsError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
