//! Session records

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{encode_json, now, serialize_json_text};

/// Alphabet for session ids; look-alike characters are left out
const SESSION_ID_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of generated session ids
pub const SESSION_ID_LEN: usize = 20;

const INSERT_ATTEMPTS: usize = 3;

/// Session record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub app_name: String,
    #[serde(skip)]
    pub tenant: String,
    pub status: String,
    #[serde(serialize_with = "serialize_json_text")]
    pub metadata: Option<String>,
    #[serde(skip)]
    pub last_sequence: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Row counts reported with a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub log_count: i64,
    pub asset_count: i64,
}

/// Generate a fresh session id
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.gen_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}

/// Session repository
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session owned by `tenant` and return its id
    pub async fn create(&self, tenant: &str, app_name: &str, metadata: Option<&Value>) -> Result<String, sqlx::Error> {
        let metadata = encode_json(metadata);
        let mut attempt = 0;

        loop {
            let id = generate_session_id();
            let now = now();
            let result = sqlx::query(
                r#"
                INSERT INTO sessions (id, app_name, tenant, metadata, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(app_name)
            .bind(tenant)
            .bind(&metadata)
            .bind(&now)
            .bind(&now)
            .execute(self.pool)
            .await;

            match result {
                Ok(_) => return Ok(id),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() && attempt + 1 < INSERT_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(attempt, "Session id collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Get a session only if `tenant` owns it
    pub async fn get_owned(&self, id: &str, tenant: &str) -> Result<Option<SessionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, app_name, tenant, status, metadata, last_sequence, created_at, updated_at
            FROM sessions
            WHERE id = ? AND tenant = ?
            "#,
        )
        .bind(id)
        .bind(tenant)
        .fetch_optional(self.pool)
        .await
    }

    /// List a tenant's sessions, most recently updated first
    pub async fn list(&self, tenant: &str, app_name: Option<&str>) -> Result<Vec<SessionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, app_name, tenant, status, metadata, last_sequence, created_at, updated_at
            FROM sessions
            WHERE tenant = ? AND (? IS NULL OR app_name = ?)
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(tenant)
        .bind(app_name)
        .bind(app_name)
        .fetch_all(self.pool)
        .await
    }

    /// Log and asset counts for a session
    pub async fn metrics(&self, id: &str) -> Result<SessionMetrics, sqlx::Error> {
        let (log_count, asset_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(1) FROM logs WHERE session_id = ?1),
                (SELECT COUNT(1) FROM assets WHERE session_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(SessionMetrics { log_count, asset_count })
    }
}

/// Refresh a session's `updated_at`
pub async fn touch_session(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Reserve `count` consecutive log sequence numbers and touch the session.
///
/// Returns the first reserved number. The increment is a single write
/// statement, so concurrent reservations inside separate transactions are
/// serialized by SQLite's write lock and never overlap.
pub async fn reserve_sequences(tx: &mut Transaction<'_, Sqlite>, id: &str, count: i64) -> Result<i64, sqlx::Error> {
    let (last,): (i64,) = sqlx::query_as(
        r#"
        UPDATE sessions
        SET last_sequence = last_sequence + ?, updated_at = ?
        WHERE id = ?
        RETURNING last_sequence
        "#,
    )
    .bind(count)
    .bind(now())
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(last - count + 1)
}
