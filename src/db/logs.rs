//! Session log entries

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

use super::sessions::reserve_sequences;
use super::{encode_json, now, serialize_json_text};

/// Level used when an entry does not carry one
pub const DEFAULT_LEVEL: &str = "info";

/// Stored log entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub sequence: i64,
    pub level: String,
    pub message: String,
    #[serde(serialize_with = "serialize_json_text")]
    pub context: Option<String>,
    pub created_at: String,
}

/// A validated entry waiting for its sequence number
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub level: String,
    pub message: String,
    pub context: Option<Value>,
}

/// Log repository
pub struct LogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LogRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append `entries` in order and touch the session.
    ///
    /// Sequence numbers are reserved on the session row and the inserts
    /// commit together, so a batch is either fully numbered and stored or
    /// not stored at all.
    pub async fn append(&self, session_id: &str, entries: &[NewLogEntry]) -> Result<usize, sqlx::Error> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let first = reserve_sequences(&mut tx, session_id, entries.len() as i64).await?;
        let created_at = now();

        for (offset, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO logs (session_id, sequence, level, message, context, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session_id)
            .bind(first + offset as i64)
            .bind(&entry.level)
            .bind(&entry.message)
            .bind(encode_json(entry.context.as_ref()))
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            session_id = %session_id,
            first_sequence = first,
            count = entries.len(),
            "Appended session logs"
        );

        Ok(entries.len())
    }

    /// All entries of a session in sequence order
    pub async fn list(&self, session_id: &str) -> Result<Vec<LogRecord>, sqlx::Error> {
        sqlx::query_as::<_, LogRecord>(
            r#"
            SELECT sequence, level, message, context, created_at
            FROM logs
            WHERE session_id = ?
            ORDER BY sequence ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(self.pool)
        .await
    }
}
