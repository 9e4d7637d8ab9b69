//! Database migrations for signon-gate
//!
//! This module contains the SQL schema for the SQLite database.

/// SQL statement to create the initial database schema
pub const CREATE_SCHEMA: &str = r#"
-- API keys table: plaintext secrets are never stored, only salt + digest
CREATE TABLE IF NOT EXISTS api_keys (
    id TEXT PRIMARY KEY,
    salt BLOB NOT NULL,
    hash BLOB NOT NULL,
    created_at TEXT NOT NULL,
    last_used_at TEXT
);

-- CORS origin whitelist
CREATE TABLE IF NOT EXISTS cors_origins (
    origin TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);
"#;

/// Get the migration version
pub fn migration_version() -> i32 {
    1
}
