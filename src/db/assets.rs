//! Session assets

use serde::Serialize;
use sqlx::SqlitePool;

use super::sessions::touch_session;
use super::{now, StoredFile};

/// Asset record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub session_id: String,
    pub object_key: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub checksum: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Asset repository
pub struct AssetRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AssetRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a batch of stored blobs and touch the session.
    ///
    /// Rows are keyed by `(session_id, filename)`; an existing row takes the
    /// new object key, type, size and checksum. `created_at` is kept.
    pub async fn upsert_batch(&self, session_id: &str, files: &[StoredFile]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let now = now();

        for file in files {
            sqlx::query(
                r#"
                INSERT INTO assets (session_id, object_key, filename, content_type, size, checksum, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(session_id, filename) DO UPDATE SET
                    object_key = excluded.object_key,
                    content_type = excluded.content_type,
                    size = excluded.size,
                    checksum = excluded.checksum,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(session_id)
            .bind(&file.object_key)
            .bind(&file.filename)
            .bind(&file.content_type)
            .bind(file.size)
            .bind(&file.checksum)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        touch_session(&mut tx, session_id).await?;
        tx.commit().await?;

        Ok(())
    }

    /// All assets of a session sorted by filename
    pub async fn list(&self, session_id: &str) -> Result<Vec<AssetRecord>, sqlx::Error> {
        sqlx::query_as::<_, AssetRecord>(
            r#"
            SELECT session_id, object_key, filename, content_type, size, checksum, created_at, updated_at
            FROM assets
            WHERE session_id = ?
            ORDER BY filename ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(self.pool)
        .await
    }

    pub async fn get(&self, session_id: &str, filename: &str) -> Result<Option<AssetRecord>, sqlx::Error> {
        sqlx::query_as::<_, AssetRecord>(
            r#"
            SELECT session_id, object_key, filename, content_type, size, checksum, created_at, updated_at
            FROM assets
            WHERE session_id = ? AND filename = ?
            "#,
        )
        .bind(session_id)
        .bind(filename)
        .fetch_optional(self.pool)
        .await
    }

    /// Every object key referenced by a session asset
    pub async fn object_keys(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT object_key FROM assets")
            .fetch_all(self.pool)
            .await
    }
}
