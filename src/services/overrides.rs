use std::sync::Arc;

use crate::domain::models::{ExamSession, SubmissionRecord};
use crate::domain::types::{FinalizeReason, UserRole};
use crate::services::errors::EngineError;
use crate::services::sessions::SessionManager;

/// Teacher-side session overrides. Every operation demands the teacher role
/// and a non-empty justification; the justification lands in the audit log
/// next to the action.
pub(crate) struct OverrideController {
    manager: Arc<SessionManager>,
}

impl OverrideController {
    pub(crate) fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    fn authorize<'a>(
        &self,
        role: UserRole,
        justification: &'a str,
    ) -> Result<&'a str, EngineError> {
        if role != UserRole::Teacher {
            return Err(EngineError::UnauthorizedOverride);
        }
        let justification = justification.trim();
        if justification.is_empty() {
            return Err(EngineError::JustificationRequired);
        }
        Ok(justification)
    }

    pub(crate) async fn extend_time(
        &self,
        role: UserRole,
        actor_id: &str,
        session_id: &str,
        minutes: u32,
        justification: &str,
    ) -> Result<ExamSession, EngineError> {
        let justification = self.authorize(role, justification)?;
        self.manager.extend_time(session_id, minutes, actor_id, justification).await
    }

    pub(crate) async fn approve_grace(
        &self,
        role: UserRole,
        actor_id: &str,
        session_id: &str,
        seconds: i64,
        justification: &str,
    ) -> Result<ExamSession, EngineError> {
        let justification = self.authorize(role, justification)?;
        self.manager.approve_grace(session_id, seconds, actor_id, justification).await
    }

    pub(crate) async fn reset_session(
        &self,
        role: UserRole,
        actor_id: &str,
        session_id: &str,
        justification: &str,
    ) -> Result<ExamSession, EngineError> {
        let justification = self.authorize(role, justification)?;
        self.manager.reset_session(session_id, actor_id, justification).await
    }

    pub(crate) async fn terminate_session(
        &self,
        role: UserRole,
        actor_id: &str,
        session_id: &str,
        justification: &str,
    ) -> Result<SubmissionRecord, EngineError> {
        let justification = self.authorize(role, justification)?;
        let view = self.manager.get_session(session_id).await?;
        if view.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }
        tracing::warn!(
            session_id = %session_id,
            actor = %actor_id,
            justification = %justification,
            "Session terminated by teacher"
        );
        self.manager.finalize(session_id, FinalizeReason::TeacherTerminated).await
    }
}
