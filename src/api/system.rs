use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HealthResponse, MessageResponse};

/// `GET /`
pub async fn root() -> Json<ApiResponse<MessageResponse>> {
    Json(ApiResponse::success(MessageResponse {
        message: "Peerly API is running".to_string(),
    }))
}

/// `GET /api/health`
///
/// Reports `ok` only when the database answers a ping.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store().ping().await {
        Ok(()) => Json(ApiResponse::success(HealthResponse {
            status: "ok".to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<HealthResponse>::error("Database unavailable")),
            )
                .into_response()
        }
    }
}

pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found("Route", uri.path())
}
