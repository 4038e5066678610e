//! App-scoped objects

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

use super::{encode_json, now, serialize_json_text, StoredFile};

/// App object record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppObjectRecord {
    pub app_name: String,
    pub object_key: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub checksum: Option<String>,
    #[serde(serialize_with = "serialize_json_text")]
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// App object repository
pub struct AppObjectRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AppObjectRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record objects extracted from an archive.
    ///
    /// Existing rows keep their metadata; the archive carries none.
    pub async fn upsert_batch(&self, app_name: &str, files: &[StoredFile]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let now = now();

        for file in files {
            sqlx::query(
                r#"
                INSERT INTO app_objects (app_name, object_key, filename, content_type, size, checksum, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(app_name, filename) DO UPDATE SET
                    object_key = excluded.object_key,
                    content_type = excluded.content_type,
                    size = excluded.size,
                    checksum = excluded.checksum,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(app_name)
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

        tx.commit().await?;

        Ok(())
    }

    /// Record a single object, replacing its metadata
    pub async fn upsert_one(
        &self,
        app_name: &str,
        file: &StoredFile,
        metadata: Option<&Value>,
    ) -> Result<AppObjectRecord, sqlx::Error> {
        let now = now();

        sqlx::query_as::<_, AppObjectRecord>(
            r#"
            INSERT INTO app_objects (app_name, object_key, filename, content_type, size, checksum, metadata, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(app_name, filename) DO UPDATE SET
                object_key = excluded.object_key,
                content_type = excluded.content_type,
                size = excluded.size,
                checksum = excluded.checksum,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            RETURNING app_name, object_key, filename, content_type, size, checksum, metadata, created_at, updated_at
            "#,
        )
        .bind(app_name)
        .bind(&file.object_key)
        .bind(&file.filename)
        .bind(&file.content_type)
        .bind(file.size)
        .bind(&file.checksum)
        .bind(encode_json(metadata))
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
    }

    /// All objects of an app sorted by filename
    pub async fn list(&self, app_name: &str) -> Result<Vec<AppObjectRecord>, sqlx::Error> {
        sqlx::query_as::<_, AppObjectRecord>(
            r#"
            SELECT app_name, object_key, filename, content_type, size, checksum, metadata, created_at, updated_at
            FROM app_objects
            WHERE app_name = ?
            ORDER BY filename ASC
            "#,
        )
        .bind(app_name)
        .fetch_all(self.pool)
        .await
    }

    pub async fn get(&self, app_name: &str, filename: &str) -> Result<Option<AppObjectRecord>, sqlx::Error> {
        sqlx::query_as::<_, AppObjectRecord>(
            r#"
            SELECT app_name, object_key, filename, content_type, size, checksum, metadata, created_at, updated_at
            FROM app_objects
            WHERE app_name = ? AND filename = ?
            "#,
        )
        .bind(app_name)
        .bind(filename)
        .fetch_optional(self.pool)
        .await
    }

    /// Remove a row; `false` if it did not exist
    pub async fn delete(&self, app_name: &str, filename: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM app_objects WHERE app_name = ? AND filename = ?")
            .bind(app_name)
            .bind(filename)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every object key referenced by an app object
    pub async fn object_keys(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT object_key FROM app_objects")
            .fetch_all(self.pool)
            .await
    }
}
