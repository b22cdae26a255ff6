//! # Health Endpoint

use super::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::warn;

/// `GET /health`
///
/// Healthy means the key-value store answers a ping. The object store is
/// only reported as configured; it is consulted lazily and its failures
/// degrade per-request instead of failing the whole service.
pub async fn health_check(State(state): State<AppState>) -> Response {
    match state.kv.ping().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "services": {
                "key_value_store": "connected",
                "object_store": "configured",
            },
            "timestamp": chrono::Utc::now(),
        }))
        .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
