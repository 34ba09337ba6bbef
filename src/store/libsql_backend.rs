//! libSQL backend: async `ProfileStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use super::migrations;
use super::traits::ProfileStore;
use crate::error::StoreError;
use crate::onboarding::model::{ProfileRecord, StoredProfile};

/// libSQL profile store.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlProfileStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlProfileStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Profile store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

#[async_trait]
impl ProfileStore for LibSqlProfileStore {
    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO profiles (uid, display_name, email, phone_number, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (uid) DO UPDATE SET
                    display_name = ?2, email = ?3, phone_number = ?4, updated_at = ?5",
                params![
                    record.uid.as_str(),
                    record.display_name.as_str(),
                    record.email.as_str(),
                    record.phone_number.as_str(),
                    now
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("upsert_profile: {e}")))?;

        debug!(uid = %record.uid, "Profile upserted");
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<StoredProfile>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT uid, display_name, email, phone_number, created_at, updated_at
                 FROM profiles WHERE uid = ?1",
                params![uid],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_profile: {e}")))?;

        let row = match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("get_profile: {e}")))?
        {
            Some(row) => row,
            None => return Ok(None),
        };

        let column = |idx: i32| -> Result<String, StoreError> {
            row.get::<String>(idx)
                .map_err(|e| StoreError::Query(format!("get_profile column {idx}: {e}")))
        };

        Ok(Some(StoredProfile {
            record: ProfileRecord {
                uid: column(0)?,
                display_name: column(1)?,
                email: column(2)?,
                phone_number: column(3)?,
            },
            created_at: parse_datetime(&column(4)?),
            updated_at: parse_datetime(&column(5)?),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> LibSqlProfileStore {
        LibSqlProfileStore::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn upsert_and_get_verbatim() {
        let store = test_store().await;
        let record = ProfileRecord::new(
            "uid-1",
            "Budi Santoso",
            "budi@example.com",
            "+6281234567890",
        );

        store.upsert_profile(&record).await.unwrap();

        let fetched = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(fetched.record, record);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = test_store().await;
        assert!(store.get_profile("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let store = test_store().await;
        store
            .upsert_profile(&ProfileRecord::new("uid-1", "Old", "old@example.com", "dev-bypass"))
            .await
            .unwrap();
        let first = store.get_profile("uid-1").await.unwrap().unwrap();

        let newer = ProfileRecord::new("uid-1", "New", "new@example.com", "+62811");
        store.upsert_profile(&newer).await.unwrap();

        let fetched = store.get_profile("uid-1").await.unwrap().unwrap();
        assert_eq!(fetched.record, newer);
        assert_eq!(fetched.created_at, first.created_at);
        assert!(fetched.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn case_and_whitespace_preserved() {
        let store = test_store().await;
        let record = ProfileRecord::new("uid-2", "  Budi SANTOSO ", "Budi@Example.COM", "dev-bypass");
        store.upsert_profile(&record).await.unwrap();
        let fetched = store.get_profile("uid-2").await.unwrap().unwrap();
        assert_eq!(fetched.record.display_name, "  Budi SANTOSO ");
        assert_eq!(fetched.record.email, "Budi@Example.COM");
    }

    #[tokio::test]
    async fn on_disk_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.db");
        let record = ProfileRecord::new("uid-3", "Budi", "budi@example.com", "+62811");

        {
            let store = LibSqlProfileStore::new_local(&path).await.unwrap();
            store.upsert_profile(&record).await.unwrap();
        }

        let reopened = LibSqlProfileStore::new_local(&path).await.unwrap();
        let fetched = reopened.get_profile("uid-3").await.unwrap().unwrap();
        assert_eq!(fetched.record, record);
    }
}
