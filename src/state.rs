//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::storage::BlobStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    blobs: BlobStore,
    db: SqlitePool,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, blobs: BlobStore, db: SqlitePool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, blobs, db }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the blob store
    pub fn blobs(&self) -> &BlobStore {
        &self.inner.blobs
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }
}
