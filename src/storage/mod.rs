//! Blob storage
//!
//! Keyed byte storage with content type and custom metadata. Supports
//! S3-compatible backends (Cloudflare R2, MinIO, Backblaze B2, AWS S3) and a
//! local filesystem backend for single-node deployments and tests.

mod local;
mod s3_client;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

pub use local::LocalBlobStorage;
pub use s3_client::S3Client;
pub use types::*;

use crate::config::StorageConfig;
use crate::error::StorageError;

/// Trait for blob storage backends
#[async_trait::async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `key`, replacing any existing blob
    async fn put(&self, key: &str, data: Vec<u8>, options: PutOptions) -> Result<ObjectMetadata, StorageError>;

    /// Fetch a blob; `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<StorageObject>, StorageError>;

    /// Remove a blob. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// All blobs whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMetadata>, StorageError>;
}

/// Blob store handle shared by all requests
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobStorage>,
}

impl BlobStore {
    /// Create with local filesystem storage
    pub fn with_local_storage(base_path: PathBuf) -> Self {
        Self {
            backend: Arc::new(LocalBlobStorage::new(base_path)),
        }
    }

    /// Create with S3 storage
    pub fn with_s3_storage(client: S3Client) -> Self {
        Self {
            backend: Arc::new(client),
        }
    }

    /// Build the backend selected by configuration
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        match config {
            StorageConfig::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                tracing::info!(path = %path.display(), "Using local blob storage");
                Ok(Self::with_local_storage(path.clone()))
            }
            StorageConfig::S3(s3) => {
                tracing::info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "Using S3 blob storage");
                Ok(Self::with_s3_storage(S3Client::new(s3).await?))
            }
        }
    }

    pub async fn put(&self, key: &str, data: Vec<u8>, options: PutOptions) -> Result<ObjectMetadata, StorageError> {
        self.backend.put(key, data, options).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<StorageObject>, StorageError> {
        self.backend.get(key).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.backend.delete(key).await
    }

    pub async fn list(&self, prefix: &str) -> Result<Vec<ObjectMetadata>, StorageError> {
        self.backend.list(prefix).await
    }
}
