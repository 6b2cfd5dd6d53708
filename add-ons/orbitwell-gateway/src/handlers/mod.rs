//! HTTP handlers. Errors use the `{status: "error", message}` body shape.

pub mod ask;
pub mod journal;
pub mod reminders;

use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

pub(crate) type ApiError = (StatusCode, Json<Value>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "message": message.into(),
        })),
    )
}

/// Storage failures surface as 500 after being logged.
pub(crate) fn storage_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!("[ORBITWELL STORAGE] {}: {}", context, err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{} failed", context))
}
