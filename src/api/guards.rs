use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::domain::types::UserRole;

pub(crate) const USER_ID_HEADER: &str = "x-user-id";
pub(crate) const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity forwarded by the gateway that fronts this service. The gateway
/// authenticates; this service only trusts its headers.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser {
    pub(crate) id: String,
    pub(crate) role: UserRole,
}

impl CurrentUser {
    pub(crate) fn is_teacher(&self) -> bool {
        self.role == UserRole::Teacher
    }
}

pub(crate) struct CurrentTeacher(pub(crate) CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized("Missing user identity"))?
            .to_string();

        let role = match parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("teacher") => UserRole::Teacher,
            Some("student") => UserRole::Student,
            _ => return Err(ApiError::Unauthorized("Missing or unknown user role")),
        };

        Ok(CurrentUser { id, role })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_teacher() {
            Ok(CurrentTeacher(user))
        } else {
            Err(ApiError::Forbidden("Teacher access required"))
        }
    }
}
