use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::domain::types::FinalizeReason;
use crate::schemas::session::{
    AnswerSubmit, CheckpointResponse, EventReport, EventResponse, SessionResponse,
    SessionStartRequest, SignalResponse, SubmissionResponse,
};
use crate::services::sessions::SessionView;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_session))
        .route("/:session_id", get(get_session))
        .route("/:session_id/answers/:question_id", put(submit_answer))
        .route("/:session_id/save", post(save_progress))
        .route("/:session_id/events", post(report_event).get(list_events))
        .route("/:session_id/disconnect", post(report_disconnect))
        .route("/:session_id/reconnect", post(reconnect))
        .route("/:session_id/submit", post(submit_session))
}

/// Owner-only access. Session ids are unguessable, but a student must still
/// not be able to drive another student's session.
async fn owned_view(
    state: &AppState,
    user: &CurrentUser,
    session_id: &str,
) -> Result<SessionView, ApiError> {
    let view = state.sessions().get_session(session_id).await?;
    if view.session.student_id != user.id {
        return Err(ApiError::Forbidden("Not your session"));
    }
    Ok(view)
}

async fn start_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SessionStartRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let session = state.sessions().start_session(&payload.assignment_id, &user.id).await?;
    let view = state.sessions().get_session(&session.id).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from_view(&view))))
}

async fn get_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = state.sessions().get_session(&session_id).await?;
    if view.session.student_id != user.id && !user.is_teacher() {
        return Err(ApiError::Forbidden("Not your session"));
    }
    Ok(Json(SessionResponse::from_view(&view)))
}

async fn submit_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((session_id, question_id)): Path<(String, String)>,
    Json(payload): Json<AnswerSubmit>,
) -> Result<Json<SessionResponse>, ApiError> {
    owned_view(&state, &user, &session_id).await?;

    state.sessions().record_answer(&session_id, &question_id, payload.answer).await?;
    let view = state.sessions().get_session(&session_id).await?;
    Ok(Json(SessionResponse::from_view(&view)))
}

async fn save_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<CheckpointResponse>, ApiError> {
    owned_view(&state, &user, &session_id).await?;

    let checkpoint = state.sessions().save_now(&session_id).await?;
    Ok(Json(CheckpointResponse {
        session_id: checkpoint.session_id,
        saved_at: crate::core::time::format_primitive(checkpoint.saved_at),
        answered_count: checkpoint.answers.len(),
        time_remaining_seconds: checkpoint.time_remaining_seconds,
    }))
}

async fn report_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
    Json(payload): Json<EventReport>,
) -> Result<Json<SignalResponse>, ApiError> {
    owned_view(&state, &user, &session_id).await?;

    let accepted = state
        .sessions()
        .record_signal(&session_id, payload.event_type, payload.metadata)
        .await?;
    Ok(Json(SignalResponse { accepted }))
}

async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<EventResponse>>, ApiError> {
    let view = state.sessions().get_session(&session_id).await?;
    if view.session.student_id != user.id && !user.is_teacher() {
        return Err(ApiError::Forbidden("Not your session"));
    }

    let events = state.sessions().events(&session_id).await?;
    Ok(Json(events.iter().map(EventResponse::from_event).collect()))
}

async fn report_disconnect(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    owned_view(&state, &user, &session_id).await?;

    state.sessions().register_disconnect(&session_id).await?;
    let view = state.sessions().get_session(&session_id).await?;
    Ok(Json(SessionResponse::from_view(&view)))
}

async fn reconnect(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    owned_view(&state, &user, &session_id).await?;

    state.sessions().reconnect(&session_id).await?;
    let view = state.sessions().get_session(&session_id).await?;
    Ok(Json(SessionResponse::from_view(&view)))
}

async fn submit_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    owned_view(&state, &user, &session_id).await?;

    let record = state.sessions().finalize(&session_id, FinalizeReason::ManualSubmit).await?;
    Ok(Json(SubmissionResponse::from_record(&record)))
}

#[cfg(test)]
mod tests;
