use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::schemas::overrides::{
    ExtendTimeRequest, GraceRequest, JustifiedRequest, TeacherSessionView,
};
use crate::schemas::session::{EventResponse, SubmissionResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/events", get(list_events))
        .route("/sessions/:session_id/extend-time", post(extend_time))
        .route("/sessions/:session_id/grace", post(approve_grace))
        .route("/sessions/:session_id/reset", post(reset_session))
        .route("/sessions/:session_id/terminate", post(terminate_session))
}

#[derive(Debug, Deserialize)]
struct SessionFilter {
    #[serde(default)]
    assignment_id: Option<String>,
}

async fn list_sessions(
    State(state): State<AppState>,
    CurrentTeacher(_): CurrentTeacher,
    Query(filter): Query<SessionFilter>,
) -> Json<Vec<TeacherSessionView>> {
    let sessions = state.sessions().list_sessions(filter.assignment_id.as_deref()).await;
    Json(sessions.iter().map(TeacherSessionView::from_session).collect())
}

async fn get_session(
    State(state): State<AppState>,
    CurrentTeacher(_): CurrentTeacher,
    Path(session_id): Path<String>,
) -> Result<Json<TeacherSessionView>, ApiError> {
    let view = state.sessions().get_session(&session_id).await?;
    Ok(Json(TeacherSessionView::from_view(&view)))
}

async fn list_events(
    State(state): State<AppState>,
    CurrentTeacher(_): CurrentTeacher,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let events = state.sessions().events(&session_id).await?;
    Ok(Json(events.iter().map(EventResponse::from_event).collect()))
}

async fn extend_time(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(session_id): Path<String>,
    Json(payload): Json<ExtendTimeRequest>,
) -> Result<Json<TeacherSessionView>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let session = state
        .overrides()
        .extend_time(
            teacher.role,
            &teacher.id,
            &session_id,
            payload.minutes,
            &payload.justification,
        )
        .await?;
    Ok(Json(TeacherSessionView::from_session(&session)))
}

async fn approve_grace(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(session_id): Path<String>,
    Json(payload): Json<GraceRequest>,
) -> Result<Json<TeacherSessionView>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let session = state
        .overrides()
        .approve_grace(
            teacher.role,
            &teacher.id,
            &session_id,
            payload.seconds,
            &payload.justification,
        )
        .await?;
    Ok(Json(TeacherSessionView::from_session(&session)))
}

async fn reset_session(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(session_id): Path<String>,
    Json(payload): Json<JustifiedRequest>,
) -> Result<Json<TeacherSessionView>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let session = state
        .overrides()
        .reset_session(teacher.role, &teacher.id, &session_id, &payload.justification)
        .await?;
    Ok(Json(TeacherSessionView::from_session(&session)))
}

async fn terminate_session(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(session_id): Path<String>,
    Json(payload): Json<JustifiedRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let record = state
        .overrides()
        .terminate_session(teacher.role, &teacher.id, &session_id, &payload.justification)
        .await?;
    Ok(Json(SubmissionResponse::from_record(&record)))
}

#[cfg(test)]
mod tests;
