//! Metadata store on SQLite
//!
//! Sessions, session logs and assets, plus the app-scoped logs and objects.
//! Every repository borrows the pool; none of them hold state of their own.

mod app_logs;
mod app_objects;
mod assets;
mod logs;
mod schema;
mod sessions;

pub use app_logs::*;
pub use app_objects::*;
pub use assets::*;
pub use logs::*;
pub use schema::*;
pub use sessions::*;

use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

/// Create a new database connection pool from a `sqlite:` URL
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    connect(SqliteConnectOptions::from_str(database_url)?).await
}

/// Open a pool with the server's pragmas and make sure the schema exists
pub async fn connect(options: SqliteConnectOptions) -> Result<SqlitePool, sqlx::Error> {
    let options = options
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Current time as stored in every timestamp column.
///
/// Fixed-width microsecond RFC 3339 with a `Z` suffix, so string order is
/// chronological order.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A blob that has been written and is ready to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub object_key: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub checksum: String,
}

/// Serialize an optional JSON object for a TEXT column
pub fn encode_json(value: Option<&Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(Value::to_string)
}

/// Parse a JSON TEXT column; text that is not JSON is returned as a string
pub fn decode_json(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

pub(crate) fn serialize_json_text<S: Serializer>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    decode_json(raw.as_deref()).serialize(serializer)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::TempDir::new().unwrap();
    let pool = connect(SqliteConnectOptions::new().filename(dir.path().join("fabric.db")))
        .await
        .unwrap();
    (dir, pool)
}
