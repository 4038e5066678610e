//! Serving stored blobs
//!
//! Single-file downloads and on-demand archive reconstruction, shared by
//! session assets and app objects.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures::{stream, FutureExt, StreamExt, TryStreamExt};

use crate::archive::{self, ArchiveEntry, SafePath};
use crate::content::{guess_content_type, is_generic_content_type};
use crate::error::{AppError, Result};
use crate::storage::BlobStore;

/// Blob fetches in flight while building an archive
const ARCHIVE_FETCH_CONCURRENCY: usize = 8;

/// A stored file as recorded in the metadata store
pub struct StoredRef<'a> {
    pub object_key: &'a str,
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
}

/// Sanitize a filename taken from the URL
pub fn parse_name(raw: &str) -> Result<SafePath> {
    SafePath::parse(raw).map_err(|_| AppError::validation("Invalid asset name"))
}

/// Public download path for a stored file
pub fn download_url(base: &str, filename: &str) -> String {
    format!("{}/{}", base, urlencoding::encode(filename))
}

/// Fetch one blob and answer with its bytes.
///
/// A recorded row whose blob is gone answers 404 and is logged.
pub async fn serve_blob(blobs: &BlobStore, stored: StoredRef<'_>) -> Result<Response> {
    let object = match blobs.get(stored.object_key).await? {
        Some(object) => object,
        None => {
            tracing::error!(
                key = %stored.object_key,
                filename = %stored.filename,
                "Metadata row references a missing blob"
            );
            return Err(AppError::NotFound("Asset not found".to_string()));
        }
    };

    let content_type = stored
        .content_type
        .filter(|ct| !is_generic_content_type(ct))
        .map(str::to_string)
        .or_else(|| object.metadata.content_type.clone())
        .unwrap_or_else(|| guess_content_type(stored.filename));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, object.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", urlencoding::encode(stored.filename)),
        );
    if let Some(etag) = &object.metadata.etag {
        builder = builder.header(header::ETAG, etag);
    }

    builder
        .body(Body::from(object.data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Fetch every blob and answer with a freshly built zip.
///
/// `stored` must already be in the order the archive should list them; at
/// most [`ARCHIVE_FETCH_CONCURRENCY`] blobs are fetched at once.
pub async fn serve_archive(blobs: &BlobStore, stored: Vec<StoredRef<'_>>, download_name: &str) -> Result<Response> {
    let fetches: Vec<_> = stored
        .into_iter()
        .map(|file| {
            async move {
                let object = blobs
                    .get(file.object_key)
                    .await?
                    .ok_or_else(|| AppError::Inconsistent(file.object_key.to_string()))?;
                let path = SafePath::parse(file.filename)
                    .map_err(|e| AppError::Internal(format!("stored filename {:?}: {}", file.filename, e)))?;
                Ok::<_, AppError>(ArchiveEntry {
                    path,
                    data: object.data,
                })
            }
            .boxed()
        })
        .collect();
    let entries: Vec<ArchiveEntry> = stream::iter(fetches)
        .buffered(ARCHIVE_FETCH_CONCURRENCY)
        .try_collect()
        .await?;

    let count = entries.len();
    let bytes = archive::bundle(entries).await?;

    tracing::debug!(download_name = %download_name, entries = count, size = bytes.len(), "Built archive");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
