use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::{ApiError, AppState, HealthResponse};

/// GET /health
///
/// Reports unhealthy with 503 when the database does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let db_ready = match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Health check failed to reach the database");
            false
        }
    };

    let body = Json(HealthResponse {
        status: if db_ready { "healthy" } else { "unhealthy" },
        app: state.config().general.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    });

    if db_ready {
        body.into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}

/// Router fallback: unknown paths still get the JSON envelope.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
