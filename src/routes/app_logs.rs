//! App-scoped log routes

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::extract::{ApiJson, ApiPath, ApiQuery, AppName, PageQuery};
use super::sessions::{normalize_level, validate_metadata};
use crate::db::{clamp_limit, AppLogPatch, AppLogRecord, AppLogRepository, PageCursor};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the app logs router; nested under `/apps/:app_name/storage`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logs", get(list_logs).post(create_log))
        .route("/logs/:log_id", get(get_log).put(update_log).delete(delete_log))
}

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Distinguishes an absent field from an explicit `null`
fn explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct UpdateLogRequest {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub metadata: Option<Option<Value>>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub log: AppLogRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsResponse {
    pub logs: Vec<AppLogRecord>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

fn invalid(field: &str, reason: &str) -> AppError {
    AppError::validation_with("Invalid payload", json!({ field: reason }))
}

fn not_found() -> AppError {
    AppError::NotFound("Log not found".to_string())
}

async fn create_log(
    State(state): State<AppState>,
    ApiPath(app_name): ApiPath<AppName>,
    ApiJson(request): ApiJson<CreateLogRequest>,
) -> Result<(StatusCode, Json<LogResponse>)> {
    if request.message.is_empty() {
        return Err(invalid("message", "must not be empty"));
    }
    let level = normalize_level(request.level.as_deref()).map_err(|reason| invalid("level", reason))?;
    let metadata = validate_metadata(request.metadata)?;

    let log = AppLogRepository::new(state.db())
        .create(app_name.as_str(), &level, &request.message, metadata.as_ref())
        .await?;

    tracing::debug!(app_name = %app_name, log_id = %log.id, "Created app log");

    Ok((StatusCode::CREATED, Json(LogResponse { log })))
}

/// Newest-first page of logs
async fn list_logs(
    State(state): State<AppState>,
    ApiPath(app_name): ApiPath<AppName>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ListLogsResponse>> {
    let limit = clamp_limit(query.limit);
    let cursor = match query.cursor.as_deref().filter(|c| !c.is_empty()) {
        Some(token) => Some(PageCursor::decode(token).ok_or_else(|| AppError::validation("Invalid cursor"))?),
        None => None,
    };

    let (logs, next_cursor) = AppLogRepository::new(state.db())
        .list_page(app_name.as_str(), limit, cursor.as_ref())
        .await?;

    Ok(Json(ListLogsResponse { logs, next_cursor }))
}

async fn get_log(
    State(state): State<AppState>,
    ApiPath((app_name, log_id)): ApiPath<(AppName, String)>,
) -> Result<Json<LogResponse>> {
    let log = AppLogRepository::new(state.db())
        .get(app_name.as_str(), &log_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(LogResponse { log }))
}

/// Partial update; an explicit `metadata: null` clears it
async fn update_log(
    State(state): State<AppState>,
    ApiPath((app_name, log_id)): ApiPath<(AppName, String)>,
    ApiJson(request): ApiJson<UpdateLogRequest>,
) -> Result<Json<LogResponse>> {
    let level = match request.level.as_deref() {
        Some(level) => Some(normalize_level(Some(level)).map_err(|reason| invalid("level", reason))?),
        None => None,
    };
    if request.message.as_deref().is_some_and(str::is_empty) {
        return Err(invalid("message", "must not be empty"));
    }
    let metadata = match request.metadata {
        Some(value) => Some(validate_metadata(value)?),
        None => None,
    };

    let patch = AppLogPatch {
        level,
        message: request.message,
        metadata,
    };
    if patch.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }

    let log = AppLogRepository::new(state.db())
        .update(app_name.as_str(), &log_id, &patch)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(LogResponse { log }))
}

async fn delete_log(
    State(state): State<AppState>,
    ApiPath((app_name, log_id)): ApiPath<(AppName, String)>,
) -> Result<Json<DeletedResponse>> {
    if !AppLogRepository::new(state.db()).delete(app_name.as_str(), &log_id).await? {
        return Err(not_found());
    }

    tracing::debug!(app_name = %app_name, log_id = %log_id, "Deleted app log");

    Ok(Json(DeletedResponse { deleted: true }))
}
