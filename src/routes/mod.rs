//! HTTP routes for the Fabric server

pub mod app_logs;
pub mod app_objects;
pub mod assets;
pub mod extract;
pub mod files;
pub mod health;
pub mod sessions;

use std::any::Any;

use axum::{middleware, response::IntoResponse, response::Response, routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_tenant;
use crate::error::AppError;
use crate::state::AppState;

/// Create the application router.
///
/// Everything except `/health`, preflight and the fallback requires a token.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/sessions", sessions::router().merge(assets::router()))
        .nest(
            "/apps/:app_name/storage",
            app_logs::router().merge(app_objects::router()),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_tenant));

    let router = Router::new()
        .route("/health", get(health::health_check))
        .merge(protected)
        .fallback(fallback)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    crate::cors::apply(router)
}

async fn fallback() -> AppError {
    AppError::NotFound("Not found".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}
