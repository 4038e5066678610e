//! Zip ingestion into the blob store
//!
//! Shared by session assets and app objects. Entries are fully decoded and
//! validated by the archive module before the first blob is written; blobs are
//! written before any metadata row so a row never points at a missing blob.

use std::collections::HashSet;

use serde_json::json;

use crate::archive::{self, ArchiveEntry, SafePath};
use crate::content::{compute_checksum, guess_content_type, is_generic_content_type};
use crate::db::StoredFile;
use crate::error::{AppError, Result};
use crate::storage::{BlobStore, PutOptions};

/// Where ingested files live in the blob store
#[derive(Debug, Clone, Copy)]
pub enum Namespace<'a> {
    Session(&'a str),
    App(&'a str),
}

impl Namespace<'_> {
    /// Blob key for a sanitized path
    pub fn object_key(&self, path: &SafePath) -> String {
        match self {
            Namespace::Session(id) => session_object_key(id, path.as_str()),
            Namespace::App(name) => app_object_key(name, path.as_str()),
        }
    }

    fn owner(&self) -> (&'static str, &str) {
        match self {
            Namespace::Session(id) => ("sessionId", id),
            Namespace::App(name) => ("appName", name),
        }
    }
}

pub fn session_object_key(session_id: &str, path: &str) -> String {
    format!("sessions/{}/{}", session_id, path)
}

pub fn app_object_key(app_name: &str, path: &str) -> String {
    format!("apps/{}/objects/{}", app_name, path)
}

/// Prefix under which every blob of a session lives
pub fn session_prefix(session_id: &str) -> String {
    format!("sessions/{}/", session_id)
}

/// Decode a zip upload and write every file to the blob store.
///
/// Returns one [`StoredFile`] per distinct path, ready to be upserted. Entries
/// that sanitize to the same path collapse to the last one. Nothing is written
/// if the archive fails to decode or expands past `budget` bytes.
pub async fn ingest_archive(
    blobs: &BlobStore,
    namespace: Namespace<'_>,
    bytes: axum::body::Bytes,
    budget: u64,
) -> Result<Vec<StoredFile>> {
    let entries = latest_per_path(archive::extract(bytes, budget).await?);

    tracing::debug!(namespace = ?namespace, entries = entries.len(), "Decoded zip upload");

    let mut stored = Vec::with_capacity(entries.len());
    for ArchiveEntry { path, data } in entries {
        stored.push(store_file(blobs, namespace, &path, data, None).await?);
    }

    Ok(stored)
}

/// Keep the last entry for each path, in the order those entries appear
fn latest_per_path(entries: Vec<ArchiveEntry>) -> Vec<ArchiveEntry> {
    let mut seen = HashSet::new();
    let mut latest: Vec<ArchiveEntry> = entries
        .into_iter()
        .rev()
        .filter(|entry| seen.insert(entry.path.as_str().to_string()))
        .collect();
    latest.reverse();
    latest
}

/// Write one file to the blob store.
///
/// `declared_type` wins over inference unless it is absent or generic.
pub async fn store_file(
    blobs: &BlobStore,
    namespace: Namespace<'_>,
    path: &SafePath,
    data: Vec<u8>,
    declared_type: Option<&str>,
) -> Result<StoredFile> {
    let checksum = compute_checksum(&data);
    let content_type = match declared_type {
        Some(declared) if !is_generic_content_type(declared) => declared.to_string(),
        _ => guess_content_type(path.as_str()),
    };
    let object_key = namespace.object_key(path);
    let size = data.len() as i64;

    let (owner_field, owner) = namespace.owner();
    let options = PutOptions::new()
        .with_content_type(content_type.clone())
        .with_metadata(owner_field, owner)
        .with_metadata("filename", path.as_str())
        .with_metadata("checksum", checksum.clone());

    blobs
        .put(&object_key, data, options)
        .await
        .map_err(|source| AppError::Storage {
            message: "Failed to store asset".to_string(),
            details: Some(json!({ "filename": path.as_str() })),
            source,
        })?;

    Ok(StoredFile {
        object_key,
        filename: path.as_str().to_string(),
        content_type,
        size,
        checksum,
    })
}
