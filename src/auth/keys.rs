//! Key issuance and verification
//!
//! The key service owns the lifecycle of API key records: issuing fresh
//! tokens, seeding a one-time bootstrap credential, verifying presented
//! tokens, and revoking or listing keys. The issued token is a bearer
//! credential of the form `{id}.{secret}`; the id half selects the record,
//! the secret half is checked against the stored salted digest.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::database::KeyStore;
use crate::error::AuthError;
use crate::models::{IssuedKey, KeyMetadata};

use super::secrets::{
    constant_time_eq, hash_secret, random_bytes, random_hex, KEY_ID_BYTES, KEY_SECRET_BYTES,
    SALT_BYTES,
};

/// Split a token into its `(id, secret)` halves
///
/// Splits on the first `.`; anything without exactly two non-empty parts
/// is malformed. Presenting a malformed token is an expected outcome, so
/// this returns `None` rather than an error.
pub fn parse_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.split_once('.')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

/// API key service
///
/// Generic over the key store so the service stays testable against an
/// in-memory mock, independent of any particular database.
pub struct KeyService<S: KeyStore> {
    store: Arc<S>,
}

impl<S: KeyStore> KeyService<S> {
    /// Create a new key service over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Issue a new API key
    ///
    /// Generates a random hex id, salt, and secret; persists the record;
    /// and returns the full token. The secret is returned exactly once and
    /// is unrecoverable thereafter.
    pub async fn issue(&self) -> Result<IssuedKey, AuthError> {
        let id = random_hex(KEY_ID_BYTES);
        let secret = random_hex(KEY_SECRET_BYTES);
        let salt = random_bytes(SALT_BYTES);
        let hash = hash_secret(&secret, &salt);
        let created_at = Utc::now();

        self.store.insert(&id, &salt, &hash, created_at).await?;

        debug!(key_id = %id, "Issued API key");

        Ok(IssuedKey {
            token: format!("{}.{}", id, secret),
            id,
            created_at,
        })
    }

    /// Seed an operator-supplied credential, exactly once
    ///
    /// No-op when the store already holds any key. The check-then-insert
    /// sequence is deliberately not transactional: a concurrent cold start
    /// can at worst insert one redundant bootstrap key, which is a minor
    /// redundancy rather than a security issue.
    pub async fn bootstrap(&self, token: &str) -> Result<(), AuthError> {
        if self.store.count().await? > 0 {
            debug!("Key store already seeded, skipping bootstrap");
            return Ok(());
        }

        let (id, secret) = parse_token(token).ok_or(AuthError::InvalidKeyFormat)?;

        let salt = random_bytes(SALT_BYTES);
        let hash = hash_secret(secret, &salt);
        self.store.insert(id, &salt, &hash, Utc::now()).await?;

        debug!(key_id = %id, "Bootstrap API key created");
        Ok(())
    }

    /// Verify a presented token
    ///
    /// Malformed tokens and unknown ids are policy rejections and return
    /// `Ok(false)`; only storage failures surface as errors. The digest
    /// comparison is constant-time.
    pub async fn verify(&self, token: &str) -> Result<bool, AuthError> {
        let Some((id, secret)) = parse_token(token) else {
            return Ok(false);
        };

        let Some(record) = self.store.fetch(id).await? else {
            return Ok(false);
        };

        let provided = hash_secret(secret, &record.salt);
        if !constant_time_eq(&provided, &record.hash) {
            return Ok(false);
        }

        // Best-effort bookkeeping; a failed timestamp update must not
        // reject an otherwise valid credential.
        if let Err(e) = self.store.touch(id, Utc::now()).await {
            warn!(key_id = %id, error = %e, "Failed to update key last-used timestamp");
        }

        Ok(true)
    }

    /// Revoke a key by id
    ///
    /// Unknown ids report `AuthError::KeyNotFound`, distinct from storage
    /// failures, so callers can map them to different HTTP statuses.
    pub async fn revoke(&self, id: &str) -> Result<(), AuthError> {
        if !self.store.delete(id).await? {
            return Err(AuthError::KeyNotFound);
        }
        Ok(())
    }

    /// List key metadata for administrative display
    ///
    /// Returns ids and timestamps only; salts and hashes never leave the
    /// service.
    pub async fn list(&self) -> Result<Vec<KeyMetadata>, AuthError> {
        let records = self.store.list().await?;
        Ok(records.iter().map(|r| r.metadata()).collect())
    }
}
