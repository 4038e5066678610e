//! Local filesystem blob storage
//!
//! Blob files are named by the SHA-256 of their key, so the layout is flat:
//! `<base>/objects/<hash>` holds the bytes and `<base>/meta/<hash>.json` the
//! key, headers and custom metadata. Keys like `docs` and `docs/readme.md`
//! therefore never compete for the same path. Listing reads the sidecars.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::content::compute_checksum;
use crate::error::StorageError;

use super::types::{ObjectMetadata, PutOptions, StorageObject};
use super::BlobStorage;

/// Local filesystem blob storage
pub struct LocalBlobStorage {
    base_path: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn meta_root(&self) -> PathBuf {
        self.base_path.join("meta")
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join("objects").join(file_name(key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.meta_root().join(format!("{}.json", file_name(key)))
    }

    async fn read_meta(&self, path: &Path) -> Result<Option<ObjectMetadata>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// On-disk name for a key
fn file_name(key: &str) -> String {
    compute_checksum(key.as_bytes())
}

async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(&self, key: &str, data: Vec<u8>, options: PutOptions) -> Result<ObjectMetadata, StorageError> {
        let object_path = self.object_path(key);
        let meta_path = self.meta_path(key);
        ensure_parent(&object_path).await?;
        ensure_parent(&meta_path).await?;

        let metadata = ObjectMetadata {
            key: key.to_string(),
            size: data.len() as i64,
            last_modified: Some(Utc::now()),
            content_type: options.content_type,
            etag: Some(format!("\"{}\"", compute_checksum(&data))),
            custom: options.custom,
        };

        // Sidecar first, so listing never misses stored bytes
        tokio::fs::write(&meta_path, serde_json::to_vec(&metadata)?).await?;
        tokio::fs::write(&object_path, &data).await?;

        Ok(metadata)
    }

    async fn get(&self, key: &str) -> Result<Option<StorageObject>, StorageError> {
        let data = match tokio::fs::read(self.object_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata = match self.read_meta(&self.meta_path(key)).await? {
            Some(metadata) => metadata,
            None => ObjectMetadata {
                key: key.to_string(),
                size: data.len() as i64,
                ..Default::default()
            },
        };

        Ok(Some(StorageObject { metadata, data }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        remove_if_exists(&self.object_path(key)).await?;
        remove_if_exists(&self.meta_path(key)).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMetadata>, StorageError> {
        let mut entries = match tokio::fs::read_dir(self.meta_root()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(metadata) = self.read_meta(&path).await? else {
                continue;
            };
            if metadata.key.starts_with(prefix) {
                objects.push(metadata);
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
