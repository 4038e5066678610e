//! Orphaned blob sweep
//!
//! Blobs are written before their metadata rows, so a failed metadata write
//! can leave blobs nothing refers to. The sweep deletes them. It must not run
//! while uploads are in flight, which is why it only runs before the listener
//! binds.

use std::collections::HashSet;

use sqlx::SqlitePool;

use crate::db::{AppObjectRepository, AssetRepository};
use crate::error::Result;
use crate::storage::BlobStore;

/// Key prefixes owned by the metadata store
pub const SWEPT_PREFIXES: [&str; 2] = ["sessions/", "apps/"];

/// Delete every blob under [`SWEPT_PREFIXES`] that no row references.
///
/// Returns the number of blobs removed.
pub async fn sweep_orphans(db: &SqlitePool, blobs: &BlobStore) -> Result<usize> {
    let mut known: HashSet<String> = AssetRepository::new(db).object_keys().await?.into_iter().collect();
    known.extend(AppObjectRepository::new(db).object_keys().await?);

    let mut removed = 0;
    for prefix in SWEPT_PREFIXES {
        for blob in blobs.list(prefix).await? {
            if known.contains(&blob.key) {
                continue;
            }
            tracing::warn!(key = %blob.key, size = blob.size, "Removing orphaned blob");
            blobs.delete(&blob.key).await?;
            removed += 1;
        }
    }

    tracing::info!(removed, referenced = known.len(), "Orphan sweep finished");

    Ok(removed)
}
