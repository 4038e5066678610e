//! S3-compatible blob storage
//!
//! Wraps the AWS SDK for Cloudflare R2, MinIO, Backblaze B2 and AWS S3.

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    operation::get_object::GetObjectError,
    primitives::ByteStream,
    Client,
};
use chrono::{DateTime, Utc};

use crate::config::{S3Config, StorageProvider};
use crate::error::StorageError;

use super::types::{ListOptions, ObjectList, ObjectMetadata, PutOptions, StorageObject};
use super::BlobStorage;

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration
    pub async fn new(config: &S3Config) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "fabric-server",
        );

        let region = config.region.clone().unwrap_or_else(|| match config.provider {
            StorageProvider::R2 => "auto".to_string(),
            _ => "us-east-1".to_string(),
        });

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(config.provider != StorageProvider::S3)
            .build();

        let client = Client::from_conf(s3_config);

        // Probe the bucket; failures are not fatal, operations will surface them
        let bucket = config.bucket.clone();
        match client.head_bucket().bucket(&bucket).send().await {
            Ok(_) => {
                tracing::info!("Connected to S3 bucket: {}", bucket);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify bucket {}: {}. Will attempt operations anyway.",
                    bucket,
                    e
                );
            }
        }

        Ok(Self { client, bucket })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// List one page of objects
    pub async fn list_objects(&self, options: ListOptions) -> Result<ObjectList, StorageError> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);

        if let Some(prefix) = options.prefix {
            request = request.prefix(prefix);
        }

        if let Some(max_keys) = options.max_keys {
            request = request.max_keys(max_keys);
        }

        if let Some(token) = options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to list objects: {}", e)))?;

        let objects: Vec<ObjectMetadata> = response
            .contents()
            .iter()
            .map(|obj| ObjectMetadata {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0),
                last_modified: obj
                    .last_modified()
                    .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos())),
                content_type: None, // Not available in list response
                etag: obj.e_tag().map(|s| s.to_string()),
                custom: Default::default(),
            })
            .collect();

        Ok(ObjectList {
            objects,
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }
}

/// A `GetObject` failure that means the key does not exist
fn is_missing_key(service: Option<&GetObjectError>, status: Option<u16>) -> bool {
    service.is_some_and(GetObjectError::is_no_such_key) || status == Some(404)
}

#[async_trait::async_trait]
impl BlobStorage for S3Client {
    async fn put(&self, key: &str, data: Vec<u8>, options: PutOptions) -> Result<ObjectMetadata, StorageError> {
        let size = data.len() as i64;
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(content_type) = &options.content_type {
            request = request.content_type(content_type);
        }

        for (name, value) in &options.custom {
            request = request.metadata(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to put object {}: {}", key, e)))?;

        Ok(ObjectMetadata {
            key: key.to_string(),
            size,
            last_modified: Some(Utc::now()),
            content_type: options.content_type,
            etag: response.e_tag().map(|s| s.to_string()),
            custom: options.custom,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<StorageObject>, StorageError> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let status = e.raw_response().map(|raw| raw.status().as_u16());
                if is_missing_key(e.as_service_error(), status) {
                    return Ok(None);
                }
                return Err(StorageError::SdkError(format!(
                    "Failed to get object {}: {}",
                    key, e
                )));
            }
        };

        let metadata = ObjectMetadata {
            key: key.to_string(),
            size: response.content_length().unwrap_or(0),
            last_modified: response
                .last_modified()
                .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos())),
            content_type: response.content_type().map(|s| s.to_string()),
            etag: response.e_tag().map(|s| s.to_string()),
            custom: response.metadata().cloned().unwrap_or_default(),
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(Some(StorageObject { metadata, data }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::SdkError(format!("Failed to delete object {}: {}", key, e)))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMetadata>, StorageError> {
        let mut all_objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let mut options = ListOptions::new().with_max_keys(1000).with_prefix(prefix);

            if let Some(token) = continuation_token.take() {
                options = options.with_continuation_token(token);
            }

            let result = self.list_objects(options).await?;
            all_objects.extend(result.objects);

            if !result.is_truncated {
                break;
            }

            continuation_token = result.continuation_token;
        }

        Ok(all_objects)
    }
}
