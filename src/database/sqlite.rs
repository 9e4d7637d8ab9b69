//! SQLite implementation of the storage traits
//!
//! This module provides a SQLite-backed implementation of both `KeyStore`
//! and `OriginStore` using rusqlite and tokio-rusqlite for async access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::{KeyStore, OriginStore};
use crate::error::DbError;
use crate::models::ApiKeyRecord;

/// SQLite database backing both the key store and the origin store
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Open a SQLite database connection and apply the schema
    ///
    /// Use `:memory:` for an in-memory database or a file path for
    /// persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl KeyStore for SqliteDatabase {
    async fn insert(
        &self,
        id: &str,
        salt: &[u8],
        hash: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let id = id.to_string();
        let salt = salt.to_vec();
        let hash = hash.to_vec();
        let created_at = created_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO api_keys (id, salt, hash, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    rusqlite::params![id, salt, hash, created_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<ApiKeyRecord>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, salt, hash, created_at, last_used_at
                    FROM api_keys
                    WHERE id = ?1
                    "#,
                )?;

                let record = stmt
                    .query_row([&id], |row| {
                        Ok(ApiKeyRecord {
                            id: row.get(0)?,
                            salt: row.get(1)?,
                            hash: row.get(2)?,
                            created_at: parse_datetime(row.get::<_, Option<String>>(3)?)
                                .unwrap_or_else(Utc::now),
                            last_used_at: parse_datetime(row.get::<_, Option<String>>(4)?),
                        })
                    })
                    .optional()?;

                Ok(record)
            })
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let id = id.to_string();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute("DELETE FROM api_keys WHERE id = ?1", [&id])?;
                Ok(count)
            })
            .await?;

        Ok(rows_affected > 0)
    }

    async fn count(&self) -> Result<u64, DbError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM api_keys", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Into::into)
    }

    async fn list(&self) -> Result<Vec<ApiKeyRecord>, DbError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, salt, hash, created_at, last_used_at
                    FROM api_keys
                    ORDER BY created_at DESC
                    "#,
                )?;

                let records = stmt
                    .query_map([], |row| {
                        Ok(ApiKeyRecord {
                            id: row.get(0)?,
                            salt: row.get(1)?,
                            hash: row.get(2)?,
                            created_at: parse_datetime(row.get::<_, Option<String>>(3)?)
                                .unwrap_or_else(Utc::now),
                            last_used_at: parse_datetime(row.get::<_, Option<String>>(4)?),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(records)
            })
            .await
            .map_err(Into::into)
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<(), DbError> {
        let id = id.to_string();
        let at = at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE api_keys SET last_used_at = ?1 WHERE id = ?2",
                    rusqlite::params![at, id],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl OriginStore for SqliteDatabase {
    async fn list(&self) -> Result<Vec<String>, DbError> {
        self.conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT origin FROM cors_origins ORDER BY origin ASC")?;

                let origins = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(origins)
            })
            .await
            .map_err(Into::into)
    }

    async fn replace_all(&self, origins: &[String]) -> Result<(), DbError> {
        let origins = origins.to_vec();
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cors_origins", [])?;
                for origin in &origins {
                    tx.execute(
                        "INSERT OR REPLACE INTO cors_origins (origin, created_at) VALUES (?1, ?2)",
                        rusqlite::params![origin, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, DbError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cors_origins", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Into::into)
    }

    async fn add(&self, origin: &str, created_at: DateTime<Utc>) -> Result<(), DbError> {
        let origin = origin.to_string();
        let created_at = created_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO cors_origins (origin, created_at) VALUES (?1, ?2)
                    ON CONFLICT(origin) DO UPDATE SET created_at = ?2
                    "#,
                    rusqlite::params![origin, created_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn remove(&self, origin: &str) -> Result<bool, DbError> {
        let origin = origin.to_string();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute("DELETE FROM cors_origins WHERE origin = ?1", [&origin])?;
                Ok(count)
            })
            .await?;

        Ok(rows_affected > 0)
    }

    async fn contains(&self, origin: &str) -> Result<bool, DbError> {
        let origin = origin.to_string();

        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cors_origins WHERE origin = ?1",
                    [&origin],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Into::into)
    }
}

/// Parse an optional RFC 3339 timestamp column
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> SqliteDatabase {
        SqliteDatabase::in_memory().await.unwrap()
    }

    // Test 1: insert then fetch round-trips a key record
    #[tokio::test]
    async fn test_key_insert_and_fetch() {
        let db = db().await;
        let created_at = Utc::now();

        KeyStore::insert(&db, "key1", &[1, 2, 3], &[4, 5, 6], created_at)
            .await
            .unwrap();

        let record = db.fetch("key1").await.unwrap().unwrap();
        assert_eq!(record.id, "key1");
        assert_eq!(record.salt, vec![1, 2, 3]);
        assert_eq!(record.hash, vec![4, 5, 6]);
        assert!(record.last_used_at.is_none());
    }

    // Test 2: fetch on an unknown id is None, not an error
    #[tokio::test]
    async fn test_key_fetch_unknown() {
        let db = db().await;
        assert!(db.fetch("missing").await.unwrap().is_none());
    }

    // Test 3: duplicate key id violates the primary key
    #[tokio::test]
    async fn test_key_insert_duplicate_fails() {
        let db = db().await;
        let now = Utc::now();

        KeyStore::insert(&db, "dup", &[1], &[2], now).await.unwrap();
        let result = KeyStore::insert(&db, "dup", &[3], &[4], now).await;
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }

    // Test 4: delete reports whether the record existed
    #[tokio::test]
    async fn test_key_delete() {
        let db = db().await;
        KeyStore::insert(&db, "key1", &[1], &[2], Utc::now())
            .await
            .unwrap();

        assert!(KeyStore::delete(&db, "key1").await.unwrap());
        assert!(!KeyStore::delete(&db, "key1").await.unwrap());
        assert!(db.fetch("key1").await.unwrap().is_none());
    }

    // Test 5: count and list follow inserts
    #[tokio::test]
    async fn test_key_count_and_list() {
        let db = db().await;
        assert_eq!(KeyStore::count(&db).await.unwrap(), 0);

        KeyStore::insert(&db, "a", &[1], &[2], Utc::now())
            .await
            .unwrap();
        KeyStore::insert(&db, "b", &[3], &[4], Utc::now())
            .await
            .unwrap();

        assert_eq!(KeyStore::count(&db).await.unwrap(), 2);
        let records = KeyStore::list(&db).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    // Test 6: touch updates last_used_at
    #[tokio::test]
    async fn test_key_touch() {
        let db = db().await;
        KeyStore::insert(&db, "key1", &[1], &[2], Utc::now())
            .await
            .unwrap();

        let used_at = Utc::now();
        db.touch("key1", used_at).await.unwrap();

        let record = db.fetch("key1").await.unwrap().unwrap();
        let stored = record.last_used_at.unwrap();
        assert!((stored - used_at).num_seconds().abs() < 2);
    }

    // Test 7: origin add, contains, list
    #[tokio::test]
    async fn test_origin_add_and_contains() {
        let db = db().await;

        db.add("https://example.com", Utc::now()).await.unwrap();
        db.add("https://other.test", Utc::now()).await.unwrap();

        assert!(db.contains("https://example.com").await.unwrap());
        assert!(!db.contains("https://unknown.test").await.unwrap());

        let origins = OriginStore::list(&db).await.unwrap();
        assert_eq!(origins.len(), 2);
        // Ordered by origin ASC
        assert_eq!(origins[0], "https://example.com");
    }

    // Test 8: add is an upsert, not a duplicate insert
    #[tokio::test]
    async fn test_origin_add_is_upsert() {
        let db = db().await;

        db.add("https://example.com", Utc::now()).await.unwrap();
        db.add("https://example.com", Utc::now()).await.unwrap();

        assert_eq!(OriginStore::count(&db).await.unwrap(), 1);
    }

    // Test 9: remove reports whether the origin existed
    #[tokio::test]
    async fn test_origin_remove() {
        let db = db().await;
        db.add("https://example.com", Utc::now()).await.unwrap();

        assert!(db.remove("https://example.com").await.unwrap());
        assert!(!db.remove("https://example.com").await.unwrap());
    }

    // Test 10: replace_all swaps the whole whitelist atomically
    #[tokio::test]
    async fn test_origin_replace_all() {
        let db = db().await;
        db.add("https://old.test", Utc::now()).await.unwrap();

        db.replace_all(&[
            "https://new-a.test".to_string(),
            "https://new-b.test".to_string(),
        ])
        .await
        .unwrap();

        let origins = OriginStore::list(&db).await.unwrap();
        assert_eq!(origins, vec!["https://new-a.test", "https://new-b.test"]);
        assert!(!db.contains("https://old.test").await.unwrap());
    }

    // Test 11: origin matching is exact and case sensitive
    #[tokio::test]
    async fn test_origin_contains_case_sensitive() {
        let db = db().await;
        db.add("https://Example.com", Utc::now()).await.unwrap();

        assert!(db.contains("https://Example.com").await.unwrap());
        assert!(!db.contains("https://example.com").await.unwrap());
    }
}
