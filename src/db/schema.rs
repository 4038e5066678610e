//! Database schema initialization

use sqlx::SqlitePool;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Sessions: one logical run, owned by the tenant that created it
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    app_name TEXT NOT NULL,
    tenant TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    metadata TEXT,
    -- Highest log sequence handed out so far
    last_sequence INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_tenant_updated ON sessions(tenant, updated_at);
CREATE INDEX IF NOT EXISTS idx_sessions_tenant_app ON sessions(tenant, app_name);

-- Append-only session logs
CREATE TABLE IF NOT EXISTS logs (
    session_id TEXT NOT NULL REFERENCES sessions(id),
    sequence INTEGER NOT NULL,
    level TEXT NOT NULL DEFAULT 'info',
    message TEXT NOT NULL,
    context TEXT,
    created_at TEXT NOT NULL,

    PRIMARY KEY (session_id, sequence)
);

-- Session assets, one row per stored blob
CREATE TABLE IF NOT EXISTS assets (
    session_id TEXT NOT NULL REFERENCES sessions(id),
    object_key TEXT NOT NULL,
    filename TEXT NOT NULL,
    content_type TEXT,
    size INTEGER NOT NULL,
    checksum TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    UNIQUE(session_id, filename)
);

-- App-scoped logs (mutable)
CREATE TABLE IF NOT EXISTS app_logs (
    id TEXT PRIMARY KEY,
    app_name TEXT NOT NULL,
    level TEXT NOT NULL DEFAULT 'info',
    message TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_app_logs_page ON app_logs(app_name, created_at, id);

-- App-scoped objects
CREATE TABLE IF NOT EXISTS app_objects (
    app_name TEXT NOT NULL,
    object_key TEXT NOT NULL,
    filename TEXT NOT NULL,
    content_type TEXT,
    size INTEGER NOT NULL,
    checksum TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    UNIQUE(app_name, filename)
);
"#;
