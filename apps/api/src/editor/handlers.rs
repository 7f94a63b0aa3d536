use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editor::{FlushReport, SessionSnapshot};
use crate::errors::AppError;
use crate::models::cv::FieldEdit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub cv_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    pub debounce_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    /// Fields waiting to be saved, plus fields whose last save failed.
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

/// POST /api/v1/editor/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<OpenSessionResponse>), AppError> {
    let session_id = state.editor.open(req.cv_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(OpenSessionResponse {
            session_id,
            debounce_ms: state.editor.debounce().as_millis() as u64,
        }),
    ))
}

/// GET /api/v1/editor/sessions/:sid
pub async fn handle_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionStatus>, AppError> {
    let snapshot = state.editor.status(session_id).await?;
    Ok(Json(SessionStatus {
        session_id,
        snapshot,
    }))
}

/// PATCH /api/v1/editor/sessions/:sid
///
/// Queues one field-group edit. Accepted, not yet saved.
pub async fn handle_schedule_edit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(edit): Json<FieldEdit>,
) -> Result<(StatusCode, Json<SessionStatus>), AppError> {
    let snapshot = state.editor.schedule(session_id, edit).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SessionStatus {
            session_id,
            snapshot,
        }),
    ))
}

/// POST /api/v1/editor/sessions/:sid/flush
pub async fn handle_flush_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FlushReport>, AppError> {
    Ok(Json(state.editor.flush(session_id).await?))
}

/// DELETE /api/v1/editor/sessions/:sid
///
/// Saves whatever is pending, then closes the session.
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FlushReport>, AppError> {
    Ok(Json(state.editor.close(session_id).await?))
}
