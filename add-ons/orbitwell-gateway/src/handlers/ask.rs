//! Companion chat and knowledge-base routes.

use super::{api_error, ApiError};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use orbitwell_core::{CompanionError, KnowledgeBase, ResponsePayload, DEFAULT_SESSION_ID};
use serde_json::Value;

/// POST /api/ask: `{message, session_id?}` -> `{response, type, protocol}`.
///
/// The body is taken as raw JSON so a missing or non-string `message` gets the
/// same 400 shape as a malformed body.
pub async fn ask(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ResponsePayload>, ApiError> {
    let Json(body) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Message is required"))?;
    let session_id = body
        .get("session_id")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SESSION_ID);

    match state.orchestrator.handle(message, session_id) {
        Ok(payload) => Ok(Json(payload)),
        Err(CompanionError::InvalidInput(msg)) => Err(api_error(StatusCode::BAD_REQUEST, msg)),
        Err(e) => {
            tracing::error!("[ORBITWELL ASK] session {}: {}", session_id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// GET /api/knowledge-base
pub async fn knowledge_base(State(state): State<AppState>) -> Json<KnowledgeBase> {
    Json(state.knowledge.as_ref().clone())
}
