//! Journal routes backed by [`JournalSqlite`](crate::journal_sqlite::JournalSqlite).
//! SQLite calls run on the blocking pool.

use super::{api_error, storage_error, ApiError};
use crate::journal_sqlite::JournalEntry;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    content: String,
}

/// GET /api/journal
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let journal = state.journal.clone();
    match tokio::task::spawn_blocking(move || journal.list()).await {
        Ok(Ok(entries)) => Ok(Json(entries)),
        Ok(Err(e)) => Err(storage_error("journal list", e)),
        Err(e) => Err(storage_error("journal list", e)),
    }
}

/// POST /api/journal
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Content is required"));
    }

    let journal = state.journal.clone();
    let entry = match tokio::task::spawn_blocking(move || journal.insert(&content)).await {
        Ok(Ok(entry)) => entry,
        Ok(Err(e)) => return Err(storage_error("journal insert", e)),
        Err(e) => return Err(storage_error("journal insert", e)),
    };
    tracing::info!("[ORBITWELL JOURNAL] Entry {} saved", entry.id);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": "success", "entry": entry })),
    ))
}

/// DELETE /api/journal/delete/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, ApiError> {
    let journal = state.journal.clone();
    let deleted = match tokio::task::spawn_blocking(move || journal.delete(id)).await {
        Ok(Ok(deleted)) => deleted,
        Ok(Err(e)) => return Err(storage_error("journal delete", e)),
        Err(e) => return Err(storage_error("journal delete", e)),
    };
    if !deleted {
        return Err(api_error(StatusCode::NOT_FOUND, "Journal entry not found"));
    }
    Ok(Json(serde_json::json!({ "status": "success", "message": "Journal entry deleted" })))
}
