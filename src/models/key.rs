//! API key domain models
//!
//! The plaintext secret never appears in these models: only the per-key
//! salt and the salted digest are persisted, and listing operations expose
//! metadata alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API key record as persisted in the key store
///
/// The `salt` and `hash` fields bind the key id to its secret; the secret
/// itself is returned exactly once at issuance and is unrecoverable
/// afterwards. Records are immutable once issued (rotation is revoke +
/// reissue), apart from the `last_used_at` bookkeeping field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyRecord {
    /// Externally visible key id, the lookup half of the issued token
    pub id: String,

    /// Random per-key salt
    pub salt: Vec<u8>,

    /// SHA-256 digest of `salt || secret`
    pub hash: Vec<u8>,

    /// When the key was issued
    pub created_at: DateTime<Utc>,

    /// When the key last passed verification
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Create a new record
    pub fn new(
        id: impl Into<String>,
        salt: Vec<u8>,
        hash: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            salt,
            hash,
            created_at,
            last_used_at: None,
        }
    }

    /// Metadata view of the record, safe for administrative listing
    pub fn metadata(&self) -> KeyMetadata {
        KeyMetadata {
            id: self.id.clone(),
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// Key metadata exposed to administrative listing
///
/// Never carries salts, hashes, or secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Key id
    pub id: String,

    /// When the key was issued
    pub created_at: DateTime<Utc>,

    /// When the key last passed verification
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Response when a key is issued (includes the raw token)
///
/// The token is only shown once at creation and cannot be retrieved later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedKey {
    /// Key id (the first half of the token)
    pub id: String,

    /// Full bearer token in `{id}.{secret}` form
    pub token: String,

    /// When the key was issued
    pub created_at: DateTime<Utc>,
}
