use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::errors::EngineError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AttemptLimitExceeded
            | EngineError::SessionAlreadyFinalized
            | EngineError::InvalidTransition => ApiError::Conflict(err.to_string()),
            EngineError::AssignmentNotOpen(_)
            | EngineError::InvalidQuestionReference(_)
            | EngineError::JustificationRequired => ApiError::BadRequest(err.to_string()),
            EngineError::AssignmentNotFound | EngineError::SessionNotFound => {
                ApiError::NotFound(err.to_string())
            }
            EngineError::UnauthorizedOverride => {
                ApiError::Forbidden("Override operations require the teacher role")
            }
            EngineError::Internal(inner) => ApiError::internal(inner, "Engine operation failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
    }
}
