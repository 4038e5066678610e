//! Session asset routes

use axum::{
    body::Body,
    extract::State,
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::extract::{read_zip_body, ApiPath, SessionId};
use super::files::{self, StoredRef};
use super::sessions::owned_session;
use crate::auth::Tenant;
use crate::db::{AssetRecord, AssetRepository, SessionRecord};
use crate::error::{AppError, Result};
use crate::ingest::{self, Namespace};
use crate::state::AppState;

/// Name under `assets/` that selects the whole-session archive
pub const ARCHIVE_NAME: &str = "archive";

/// Create the assets router; merged under `/sessions`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:session_id/assets", get(list_assets).post(upload_assets))
        .route("/:session_id/assets/*name", get(get_asset))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub stored: usize,
}

/// Ingest a zip of assets into a session
async fn upload_assets(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(session_id): ApiPath<SessionId>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>> {
    let session = owned_session(&state, &tenant, &session_id).await?;
    let bytes = read_zip_body(&headers, body, state.config().upload.limit_bytes()).await?;

    let stored = ingest::ingest_archive(
        state.blobs(),
        Namespace::Session(&session.id),
        bytes,
        state.config().upload.extract_limit_bytes(),
    )
    .await?;

    AssetRepository::new(state.db())
        .upsert_batch(&session.id, &stored)
        .await
        .map_err(|e| {
            tracing::warn!(session_id = %session.id, blobs = stored.len(), "Blobs written without metadata");
            AppError::persistence(e)
        })?;

    tracing::info!(session_id = %session.id, stored = stored.len(), "Stored session assets");

    Ok(Json(UploadResponse { stored: stored.len() }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: AssetRecord,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct ListAssetsResponse {
    pub session: SessionRecord,
    pub assets: Vec<AssetView>,
}

/// List a session's assets with download links
async fn list_assets(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(session_id): ApiPath<SessionId>,
) -> Result<Json<ListAssetsResponse>> {
    let session = owned_session(&state, &tenant, &session_id).await?;
    let base = format!("/sessions/{}/assets", session.id);

    let assets = AssetRepository::new(state.db())
        .list(&session.id)
        .await?
        .into_iter()
        .map(|asset| AssetView {
            download_url: files::download_url(&base, &asset.filename),
            asset,
        })
        .collect();

    Ok(Json(ListAssetsResponse { session, assets }))
}

/// Download one asset, or the whole session as a zip
async fn get_asset(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath((session_id, name)): ApiPath<(SessionId, String)>,
) -> Result<Response> {
    let session = owned_session(&state, &tenant, &session_id).await?;

    if name == ARCHIVE_NAME {
        return get_archive(&state, &session).await;
    }

    let path = files::parse_name(&name)?;
    let asset = AssetRepository::new(state.db())
        .get(&session.id, path.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;

    files::serve_blob(
        state.blobs(),
        StoredRef {
            object_key: &asset.object_key,
            filename: &asset.filename,
            content_type: asset.content_type.as_deref(),
        },
    )
    .await
}

async fn get_archive(state: &AppState, session: &SessionRecord) -> Result<Response> {
    let assets = AssetRepository::new(state.db()).list(&session.id).await?;
    if assets.is_empty() {
        return Err(AppError::NotFound("No assets found for session".to_string()));
    }

    let stored = assets
        .iter()
        .map(|asset| StoredRef {
            object_key: &asset.object_key,
            filename: &asset.filename,
            content_type: asset.content_type.as_deref(),
        })
        .collect();

    files::serve_archive(state.blobs(), stored, &format!("{}.zip", session.id)).await
}
