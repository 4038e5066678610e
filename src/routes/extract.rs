//! Request extractors
//!
//! Thin wrappers over axum's extractors that reject with [`AppError`], typed
//! path segments validated during deserialization, and the zip body reader
//! shared by the upload routes.

use std::fmt;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderMap;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// `Json` that rejects with the service's error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` that rejects with the service's error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// `Query` that rejects with the service's error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

const MAX_SESSION_ID_LEN: usize = 64;
pub const MAX_APP_NAME_LEN: usize = 128;

/// Session id path segment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = &'static str;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value.is_empty() || value.len() > MAX_SESSION_ID_LEN || !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err("Invalid session id");
        }
        Ok(Self(value))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// App name path segment: `[A-Za-z0-9._-]{1,128}`, never `.` or `..`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AppName(String);

impl AppName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AppName {
    type Error = &'static str;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let valid_chars = value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
        if value.is_empty() || value.len() > MAX_APP_NAME_LEN || !valid_chars || value == "." || value == ".." {
            return Err("Invalid app name");
        }
        Ok(Self(value))
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pagination query
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// Buffer a zip upload body.
///
/// The declared type must mention `application/zip`; the size is checked
/// against `Content-Length` first and again while reading, since the header
/// can be absent or wrong.
pub async fn read_zip_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes> {
    let is_zip = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("application/zip"))
        .unwrap_or(false);
    if !is_zip {
        return Err(AppError::UnsupportedMediaType(
            "Content-Type must be application/zip".to_string(),
        ));
    }

    read_body(headers, body, limit).await
}

/// Buffer a raw body up to `limit` bytes
pub async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes> {
    let too_large = || AppError::PayloadTooLarge(format!("Payload exceeds {} byte limit", limit));

    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!(error = %e, limit, "Rejected upload body");
        too_large()
    })
}
