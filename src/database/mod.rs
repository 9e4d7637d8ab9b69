//! Database layer for signon-gate
//!
//! This module defines the storage traits consumed by the trust-and-access
//! core and their SQLite implementation. The core treats both stores as
//! atomic black boxes: they provide their own consistency guarantees (a
//! single-writer SQLite connection here) and the core adds no locking of
//! its own around them.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::ApiKeyRecord;

/// Persistence contract for API key records
///
/// Implemented by the SQLite store in production and by a mockall mock in
/// tests. Keys are immutable once inserted except for the last-used
/// bookkeeping column.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Insert a new key record
    async fn insert(
        &self,
        id: &str,
        salt: &[u8],
        hash: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Fetch a key record by id
    async fn fetch(&self, id: &str) -> Result<Option<ApiKeyRecord>, DbError>;

    /// Delete a key record by id
    ///
    /// Returns `true` if a record existed and was deleted
    async fn delete(&self, id: &str) -> Result<bool, DbError>;

    /// Number of stored key records
    async fn count(&self) -> Result<u64, DbError>;

    /// List all key records, newest first
    async fn list(&self) -> Result<Vec<ApiKeyRecord>, DbError>;

    /// Update a key's last-used timestamp
    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<(), DbError>;
}

/// Persistence contract for the allowed-origin whitelist
///
/// The whitelist is an ordered list of literal origin strings. Duplicate
/// suppression is this store's responsibility (the SQLite implementation
/// upserts on the origin column).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OriginStore: Send + Sync {
    /// List all allowed origins
    async fn list(&self) -> Result<Vec<String>, DbError>;

    /// Replace the whole whitelist
    async fn replace_all(&self, origins: &[String]) -> Result<(), DbError>;

    /// Number of whitelisted origins
    async fn count(&self) -> Result<u64, DbError>;

    /// Add an origin to the whitelist (upsert)
    async fn add(&self, origin: &str, created_at: DateTime<Utc>) -> Result<(), DbError>;

    /// Remove an origin from the whitelist
    ///
    /// Returns `true` if the origin was present and removed
    async fn remove(&self, origin: &str) -> Result<bool, DbError>;

    /// Check whether an origin is whitelisted (exact string match)
    async fn contains(&self, origin: &str) -> Result<bool, DbError>;
}
