use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::domain::models::ExamSession;
use crate::domain::types::SessionStatus;
use crate::services::sessions::SessionView;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExtendTimeRequest {
    #[validate(range(min = 1, message = "minutes must be positive"))]
    pub(crate) minutes: u32,
    #[validate(length(min = 1, message = "justification must not be empty"))]
    pub(crate) justification: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GraceRequest {
    #[validate(range(min = 1, message = "seconds must be positive"))]
    pub(crate) seconds: i64,
    #[validate(length(min = 1, message = "justification must not be empty"))]
    pub(crate) justification: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct JustifiedRequest {
    #[validate(length(min = 1, message = "justification must not be empty"))]
    pub(crate) justification: String,
}

/// Monitoring row for the teacher dashboard. Progress is answered questions
/// over total, not cursor position.
#[derive(Debug, Serialize)]
pub(crate) struct TeacherSessionView {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: u32,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: String,
    pub(crate) expected_end_at: String,
    pub(crate) time_remaining_seconds: i64,
    pub(crate) answered_count: usize,
    pub(crate) total_questions: usize,
    pub(crate) progress_percent: f64,
    pub(crate) disconnect_count: u32,
    pub(crate) flagged_for_review: bool,
}

impl TeacherSessionView {
    pub(crate) fn from_session(session: &ExamSession) -> Self {
        let total_questions = session.question_order.len();
        let answered_count = session.answered_count();
        let progress_percent = if total_questions == 0 {
            0.0
        } else {
            (answered_count as f64 / total_questions as f64 * 1000.0).round() / 10.0
        };
        Self {
            id: session.id.clone(),
            assignment_id: session.assignment_id.clone(),
            student_id: session.student_id.clone(),
            attempt_number: session.attempt_number,
            status: session.status,
            started_at: format_primitive(session.started_at),
            expected_end_at: format_primitive(session.expected_end_at),
            time_remaining_seconds: session.time_remaining_seconds,
            answered_count,
            total_questions,
            progress_percent,
            disconnect_count: session.disconnect_count,
            flagged_for_review: session.flagged_for_review,
        }
    }

    pub(crate) fn from_view(view: &SessionView) -> Self {
        Self::from_session(&view.session)
    }
}
