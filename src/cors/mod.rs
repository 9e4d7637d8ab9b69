//! CORS origin whitelist service
//!
//! Validates the `Origin` request header against a persisted whitelist.
//! CORS is a browser-enforced concept: requests without an Origin header
//! (the CLI, server-to-server calls) are always allowed, and a non-empty
//! origin is allowed only on an exact, case-sensitive string match.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::database::OriginStore;
use crate::error::CorsError;

/// CORS response header values emitted by the middleware
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const MAX_AGE_SECS: &str = "86400";

/// CORS whitelist service
pub struct CorsService<S: OriginStore> {
    store: Arc<S>,
}

impl<S: OriginStore> CorsService<S> {
    /// Create a new CORS service over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check whether an origin may make cross-origin requests
    ///
    /// An empty origin is always allowed; there is no Origin header to
    /// enforce against. No wildcard or scheme-relative matching.
    pub async fn is_allowed(&self, origin: &str) -> Result<bool, CorsError> {
        if origin.is_empty() {
            return Ok(true);
        }

        Ok(self.store.contains(origin).await?)
    }

    /// Seed the whitelist from configuration, exactly once
    ///
    /// No-op when the store already holds any origin, so operator edits
    /// made through the admin API survive restarts.
    pub async fn seed(&self, initial: &[String]) -> Result<(), CorsError> {
        if self.store.count().await? > 0 {
            debug!("Origin whitelist already seeded, skipping");
            return Ok(());
        }

        if initial.is_empty() {
            return Ok(());
        }

        self.store.replace_all(initial).await?;
        info!(count = initial.len(), "Seeded CORS origin whitelist");
        Ok(())
    }

    /// List all whitelisted origins
    pub async fn origins(&self) -> Result<Vec<String>, CorsError> {
        Ok(self.store.list().await?)
    }

    /// Add an origin to the whitelist
    pub async fn add(&self, origin: &str) -> Result<(), CorsError> {
        let origin = origin.trim();
        if origin.is_empty() {
            return Err(CorsError::EmptyOrigin);
        }

        self.store.add(origin, Utc::now()).await?;
        info!(origin = %origin, "CORS origin added");
        Ok(())
    }

    /// Remove an origin from the whitelist
    pub async fn remove(&self, origin: &str) -> Result<(), CorsError> {
        if !self.store.remove(origin).await? {
            return Err(CorsError::OriginNotFound);
        }

        info!(origin = %origin, "CORS origin removed");
        Ok(())
    }
}
