//! Reminder CRUD and stats routes.

use super::{api_error, ApiError};
use crate::reminders::{NewReminder, Reminder, ReminderUpdate};
use crate::stats::{self, ReminderStats};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

/// GET /api/reminders
pub async fn list(State(state): State<AppState>) -> Json<Vec<Reminder>> {
    Json(state.reminders.list().await)
}

/// POST /api/reminders
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewReminder>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let reminder = state
        .reminders
        .create(req)
        .await
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Title and datetime are required"))?;
    tracing::info!("[ORBITWELL REMINDERS] Created reminder {} ({})", reminder.id, reminder.category);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": "success", "reminder": reminder })),
    ))
}

/// PUT /api/reminders/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Result<Json<ReminderUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let reminder = state
        .reminders
        .update(id, update)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Reminder not found"))?;
    Ok(Json(serde_json::json!({ "status": "success", "reminder": reminder })))
}

/// DELETE /api/reminders/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, ApiError> {
    if !state.reminders.delete(id).await {
        return Err(api_error(StatusCode::NOT_FOUND, "Reminder not found"));
    }
    Ok(Json(serde_json::json!({ "status": "success", "message": "Reminder deleted" })))
}

/// GET /reminder-stats
pub async fn reminder_stats(State(state): State<AppState>) -> Json<ReminderStats> {
    let reminders = state.reminders.list().await;
    let today = chrono::Local::now().date_naive();
    Json(stats::summarize(&reminders, today))
}
