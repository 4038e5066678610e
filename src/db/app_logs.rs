//! App-scoped logs with keyset pagination

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{encode_json, now, serialize_json_text};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a requested page size to `[1, MAX_PAGE_LIMIT]`
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

/// App log record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppLogRecord {
    pub id: String,
    pub app_name: String,
    pub level: String,
    pub message: String,
    #[serde(serialize_with = "serialize_json_text")]
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update of an app log.
///
/// `metadata: Some(None)` clears the column, `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct AppLogPatch {
    pub level: Option<String>,
    pub message: Option<String>,
    pub metadata: Option<Option<Value>>,
}

impl AppLogPatch {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.message.is_none() && self.metadata.is_none()
    }
}

/// Position after the last row of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    #[serde(rename = "c")]
    pub created_at: String,
    #[serde(rename = "i")]
    pub id: String,
}

impl PageCursor {
    /// Opaque base64url token
    pub fn encode(&self) -> String {
        // Serializing two strings cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Parse a token produced by [`PageCursor::encode`]
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// App log repository
pub struct AppLogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AppLogRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        app_name: &str,
        level: &str,
        message: &str,
        metadata: Option<&Value>,
    ) -> Result<AppLogRecord, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = now();

        sqlx::query_as::<_, AppLogRecord>(
            r#"
            INSERT INTO app_logs (id, app_name, level, message, metadata, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, app_name, level, message, metadata, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(app_name)
        .bind(level)
        .bind(message)
        .bind(encode_json(metadata))
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
    }

    pub async fn get(&self, app_name: &str, id: &str) -> Result<Option<AppLogRecord>, sqlx::Error> {
        sqlx::query_as::<_, AppLogRecord>(
            r#"
            SELECT id, app_name, level, message, metadata, created_at, updated_at
            FROM app_logs
            WHERE app_name = ? AND id = ?
            "#,
        )
        .bind(app_name)
        .bind(id)
        .fetch_optional(self.pool)
        .await
    }

    /// One page of logs, newest first.
    ///
    /// Returns the rows and, when the page is full, the cursor for the next one.
    pub async fn list_page(
        &self,
        app_name: &str,
        limit: i64,
        after: Option<&PageCursor>,
    ) -> Result<(Vec<AppLogRecord>, Option<String>), sqlx::Error> {
        let rows = match after {
            None => {
                sqlx::query_as::<_, AppLogRecord>(
                    r#"
                    SELECT id, app_name, level, message, metadata, created_at, updated_at
                    FROM app_logs
                    WHERE app_name = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(app_name)
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
            Some(cursor) => {
                sqlx::query_as::<_, AppLogRecord>(
                    r#"
                    SELECT id, app_name, level, message, metadata, created_at, updated_at
                    FROM app_logs
                    WHERE app_name = ?
                      AND (created_at < ? OR (created_at = ? AND id < ?))
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(app_name)
                .bind(&cursor.created_at)
                .bind(&cursor.created_at)
                .bind(&cursor.id)
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
        };

        let next = if rows.len() as i64 == limit {
            rows.last().map(|last| {
                PageCursor {
                    created_at: last.created_at.clone(),
                    id: last.id.clone(),
                }
                .encode()
            })
        } else {
            None
        };

        Ok((rows, next))
    }

    /// Apply a patch and refresh `updated_at`; `None` if the log does not exist
    pub async fn update(&self, app_name: &str, id: &str, patch: &AppLogPatch) -> Result<Option<AppLogRecord>, sqlx::Error> {
        let (replace_metadata, metadata) = match &patch.metadata {
            Some(value) => (true, encode_json(value.as_ref())),
            None => (false, None),
        };

        sqlx::query_as::<_, AppLogRecord>(
            r#"
            UPDATE app_logs
            SET level = COALESCE(?, level),
                message = COALESCE(?, message),
                metadata = CASE WHEN ? THEN ? ELSE metadata END,
                updated_at = ?
            WHERE app_name = ? AND id = ?
            RETURNING id, app_name, level, message, metadata, created_at, updated_at
            "#,
        )
        .bind(&patch.level)
        .bind(&patch.message)
        .bind(replace_metadata)
        .bind(metadata)
        .bind(now())
        .bind(app_name)
        .bind(id)
        .fetch_optional(self.pool)
        .await
    }

    /// Delete a log; `false` if it did not exist
    pub async fn delete(&self, app_name: &str, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM app_logs WHERE app_name = ? AND id = ?")
            .bind(app_name)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
