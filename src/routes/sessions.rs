//! Session and session log routes

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::extract::{read_body, ApiJson, ApiPath, ApiQuery, SessionId, MAX_APP_NAME_LEN};
use crate::auth::Tenant;
use crate::db::{
    LogRecord, LogRepository, NewLogEntry, SessionMetrics, SessionRecord, SessionRepository, DEFAULT_LEVEL,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

const MAX_LEVEL_LEN: usize = 32;

/// Create the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session).get(list_sessions))
        .route("/:session_id", get(get_session))
        .route("/:session_id/logs", post(append_logs).get(list_logs))
}

/// Load a session the caller owns; anything else is "not found"
pub(crate) async fn owned_session(state: &AppState, tenant: &Tenant, id: &SessionId) -> Result<SessionRecord> {
    SessionRepository::new(state.db())
        .get_owned(id.as_str(), tenant.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

/// Metadata must be a JSON object when present
pub(crate) fn validate_metadata(metadata: Option<Value>) -> Result<Option<Value>> {
    match metadata {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => Ok(Some(value)),
        Some(_) => Err(AppError::validation_with(
            "Invalid payload",
            json!({ "metadata": "must be a JSON object" }),
        )),
    }
}

/// Level defaults to `info`; otherwise trimmed and 1..=32 chars
pub(crate) fn normalize_level(level: Option<&str>) -> std::result::Result<String, &'static str> {
    match level.map(str::trim) {
        None => Ok(DEFAULT_LEVEL.to_string()),
        Some(level) if level.is_empty() || level.chars().count() > MAX_LEVEL_LEN => {
            Err("level must be 1 to 32 characters")
        }
        Some(level) => Ok(level.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub app_name: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// Create a session owned by the caller
async fn create_session(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiJson(request): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>)> {
    let app_name = request.app_name.trim();
    if app_name.is_empty() || app_name.chars().count() > MAX_APP_NAME_LEN {
        return Err(AppError::validation_with(
            "Invalid payload",
            json!({ "appName": "must be 1 to 128 characters" }),
        ));
    }
    let metadata = validate_metadata(request.metadata)?;

    let session_id = SessionRepository::new(state.db())
        .create(tenant.as_str(), app_name, metadata.as_ref())
        .await?;

    tracing::info!(session_id = %session_id, app_name = %app_name, "Created session");

    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsQuery {
    pub app_name: Option<String>,
}

/// Session as listed; keyed by `sessionId` rather than `id`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListItem {
    pub session_id: String,
    pub app_name: String,
    pub metadata: Value,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SessionRecord> for SessionListItem {
    fn from(record: SessionRecord) -> Self {
        Self {
            metadata: crate::db::decode_json(record.metadata.as_deref()),
            session_id: record.id,
            app_name: record.app_name,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionListItem>,
}

/// List the caller's sessions, most recently updated first
async fn list_sessions(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiQuery(query): ApiQuery<ListSessionsQuery>,
) -> Result<Json<ListSessionsResponse>> {
    let filter = query
        .app_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("all"));

    let sessions = SessionRepository::new(state.db())
        .list(tenant.as_str(), filter)
        .await?
        .into_iter()
        .map(SessionListItem::from)
        .collect();

    Ok(Json(ListSessionsResponse { sessions }))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionRecord,
    pub metrics: SessionMetrics,
}

/// Get a session with its log and asset counts
async fn get_session(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(session_id): ApiPath<SessionId>,
) -> Result<Json<SessionResponse>> {
    let session = owned_session(&state, &tenant, &session_id).await?;
    let metrics = SessionRepository::new(state.db()).metrics(&session.id).await?;

    Ok(Json(SessionResponse { session, metrics }))
}

#[derive(Debug, Deserialize)]
pub struct AppendLogsRequest {
    pub entries: Vec<LogEntryInput>,
}

#[derive(Debug, Deserialize)]
pub struct LogEntryInput {
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AppendLogsResponse {
    pub inserted: usize,
}

/// Append a batch of log entries.
///
/// The body is parsed only once the session is known to exist, so an unknown
/// session is 404 whatever the payload.
async fn append_logs(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(session_id): ApiPath<SessionId>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<AppendLogsResponse>> {
    let session = owned_session(&state, &tenant, &session_id).await?;
    let bytes = read_body(&headers, body, state.config().upload.limit_bytes()).await?;
    let Json(request) = Json::<AppendLogsRequest>::from_bytes(&bytes)?;

    if request.entries.is_empty() {
        return Err(AppError::validation_with(
            "Invalid payload",
            json!({ "entries": "must contain at least one entry" }),
        ));
    }

    let mut entries = Vec::with_capacity(request.entries.len());
    for (index, entry) in request.entries.into_iter().enumerate() {
        if entry.message.is_empty() {
            return Err(AppError::validation_with(
                "Invalid payload",
                json!({ "entries": { index.to_string(): "message must not be empty" } }),
            ));
        }
        let level = normalize_level(entry.level.as_deref()).map_err(|reason| {
            AppError::validation_with("Invalid payload", json!({ "entries": { index.to_string(): reason } }))
        })?;
        entries.push(NewLogEntry {
            level,
            message: entry.message,
            context: entry.context,
        });
    }

    let inserted = LogRepository::new(state.db()).append(&session.id, &entries).await?;

    Ok(Json(AppendLogsResponse { inserted }))
}

#[derive(Debug, Serialize)]
pub struct ListLogsResponse {
    pub session: SessionRecord,
    pub entries: Vec<LogRecord>,
}

/// All log entries of a session in sequence order
async fn list_logs(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiPath(session_id): ApiPath<SessionId>,
) -> Result<Json<ListLogsResponse>> {
    let session = owned_session(&state, &tenant, &session_id).await?;
    let entries = LogRepository::new(state.db()).list(&session.id).await?;

    Ok(Json(ListLogsResponse { session, entries }))
}
