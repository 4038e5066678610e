//! App-scoped object routes

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::assets::{UploadResponse, ARCHIVE_NAME};
use super::extract::{read_body, read_zip_body, ApiPath, AppName};
use super::files::{self, StoredRef};
use super::sessions::validate_metadata;
use crate::db::{AppObjectRecord, AppObjectRepository};
use crate::error::{AppError, Result};
use crate::ingest::{self, Namespace};
use crate::state::AppState;

/// Header carrying a JSON object stored alongside a raw upload
pub const OBJECT_METADATA_HEADER: &str = "x-object-metadata";

/// Create the app objects router; nested under `/apps/:app_name/storage`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/objects", get(list_objects).post(upload_objects))
        .route("/objects/*name", get(get_object).put(put_object).delete(delete_object))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectView {
    #[serde(flatten)]
    pub object: AppObjectRecord,
    pub download_url: String,
}

impl ObjectView {
    fn new(object: AppObjectRecord) -> Self {
        let base = format!("/apps/{}/storage/objects", object.app_name);
        Self {
            download_url: files::download_url(&base, &object.filename),
            object,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListObjectsResponse {
    pub objects: Vec<ObjectView>,
}

#[derive(Debug, Serialize)]
pub struct ObjectResponse {
    pub object: ObjectView,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

fn not_found() -> AppError {
    AppError::NotFound("Object not found".to_string())
}

/// Ingest a zip of objects for an app
async fn upload_objects(
    State(state): State<AppState>,
    ApiPath(app_name): ApiPath<AppName>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>> {
    let bytes = read_zip_body(&headers, body, state.config().upload.limit_bytes()).await?;
    let stored = ingest::ingest_archive(
        state.blobs(),
        Namespace::App(app_name.as_str()),
        bytes,
        state.config().upload.extract_limit_bytes(),
    )
    .await?;

    AppObjectRepository::new(state.db())
        .upsert_batch(app_name.as_str(), &stored)
        .await
        .map_err(|e| {
            tracing::warn!(app_name = %app_name, blobs = stored.len(), "Blobs written without metadata");
            AppError::persistence(e)
        })?;

    tracing::info!(app_name = %app_name, stored = stored.len(), "Stored app objects");

    Ok(Json(UploadResponse { stored: stored.len() }))
}

/// Parse the optional metadata header
fn header_metadata(headers: &HeaderMap) -> Result<Option<Value>> {
    let Some(raw) = headers.get(OBJECT_METADATA_HEADER) else {
        return Ok(None);
    };
    let value = raw
        .to_str()
        .ok()
        .and_then(|text| serde_json::from_str::<Value>(text).ok())
        .ok_or_else(|| {
            AppError::validation_with("Invalid payload", json!({ "X-Object-Metadata": "must be a JSON object" }))
        })?;
    validate_metadata(Some(value))
}

/// Store a single object from the raw request body
async fn put_object(
    State(state): State<AppState>,
    ApiPath((app_name, name)): ApiPath<(AppName, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ObjectResponse>> {
    if name == ARCHIVE_NAME {
        return Err(AppError::validation("Invalid asset name"));
    }
    let path = files::parse_name(&name)?;
    let metadata = header_metadata(&headers)?;
    let bytes = read_body(&headers, body, state.config().upload.limit_bytes()).await?;
    let declared = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    let stored = ingest::store_file(
        state.blobs(),
        Namespace::App(app_name.as_str()),
        &path,
        bytes.to_vec(),
        declared,
    )
    .await?;

    let object = AppObjectRepository::new(state.db())
        .upsert_one(app_name.as_str(), &stored, metadata.as_ref())
        .await
        .map_err(AppError::persistence)?;

    tracing::info!(app_name = %app_name, filename = %object.filename, size = object.size, "Stored app object");

    Ok(Json(ObjectResponse {
        object: ObjectView::new(object),
    }))
}

async fn list_objects(
    State(state): State<AppState>,
    ApiPath(app_name): ApiPath<AppName>,
) -> Result<Json<ListObjectsResponse>> {
    let objects = AppObjectRepository::new(state.db())
        .list(app_name.as_str())
        .await?
        .into_iter()
        .map(ObjectView::new)
        .collect();

    Ok(Json(ListObjectsResponse { objects }))
}

/// Download one object, or every object of the app as a zip
async fn get_object(
    State(state): State<AppState>,
    ApiPath((app_name, name)): ApiPath<(AppName, String)>,
) -> Result<Response> {
    if name == ARCHIVE_NAME {
        return get_archive(&state, &app_name).await;
    }

    let path = files::parse_name(&name)?;
    let object = AppObjectRepository::new(state.db())
        .get(app_name.as_str(), path.as_str())
        .await?
        .ok_or_else(not_found)?;

    files::serve_blob(
        state.blobs(),
        StoredRef {
            object_key: &object.object_key,
            filename: &object.filename,
            content_type: object.content_type.as_deref(),
        },
    )
    .await
}

async fn get_archive(state: &AppState, app_name: &AppName) -> Result<Response> {
    let objects = AppObjectRepository::new(state.db()).list(app_name.as_str()).await?;
    if objects.is_empty() {
        return Err(AppError::NotFound("No objects found for app".to_string()));
    }

    let stored = objects
        .iter()
        .map(|object| StoredRef {
            object_key: &object.object_key,
            filename: &object.filename,
            content_type: object.content_type.as_deref(),
        })
        .collect();

    files::serve_archive(state.blobs(), stored, &format!("{}.zip", app_name)).await
}

/// Remove the blob, then the row
async fn delete_object(
    State(state): State<AppState>,
    ApiPath((app_name, name)): ApiPath<(AppName, String)>,
) -> Result<Json<DeletedResponse>> {
    let path = files::parse_name(&name)?;
    let repo = AppObjectRepository::new(state.db());
    let object = repo.get(app_name.as_str(), path.as_str()).await?.ok_or_else(not_found)?;

    state
        .blobs()
        .delete(&object.object_key)
        .await
        .map_err(|e| AppError::storage("Failed to delete object", e))?;
    repo.delete(app_name.as_str(), &object.filename).await?;

    tracing::info!(app_name = %app_name, filename = %object.filename, "Deleted app object");

    Ok(Json(DeletedResponse { deleted: true }))
}
