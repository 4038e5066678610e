//! Shared-secret authentication and tenant derivation

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

/// Alternate header carrying the raw token
pub const TOKEN_HEADER: &str = "x-fabric-token";

/// Partition key derived from the caller's token. Never shown to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(String);

impl Tenant {
    pub fn from_token(token: &str) -> Self {
        Self(hash_token(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lowercase hex SHA-256 of a token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the caller's token: `Authorization: Bearer` first, then
/// `X-Fabric-Token`. The scheme is case-insensitive; values are trimmed.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let v = v.trim();
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

/// Constant-time comparison of a presented token against the secret
pub fn token_matches(presented: &str, secret: &str) -> bool {
    presented.as_bytes().ct_eq(secret.as_bytes()).into()
}

/// Resolve the tenant for a request, or the error to answer with
pub fn authenticate(headers: &HeaderMap, secret: Option<&str>) -> Result<Tenant, AppError> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization token".to_string()))?;

    let secret = secret.ok_or_else(|| AppError::Configuration("FABRIC_TOKEN is not set".to_string()))?;

    if !token_matches(token, secret) {
        tracing::debug!("Rejected request with invalid token");
        return Err(AppError::Forbidden("Invalid token".to_string()));
    }

    Ok(Tenant::from_token(token))
}

/// Middleware that rejects unauthenticated requests and stores the [`Tenant`]
/// in request extensions.
pub async fn require_tenant(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let tenant = authenticate(req.headers(), state.config().auth.secret())?;
    req.extensions_mut().insert(tenant);
    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Tenant>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization token".to_string()))
    }
}
