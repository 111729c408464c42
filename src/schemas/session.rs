use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::domain::models::{Answer, ExamEvent, GradeResult, SubmissionRecord};
use crate::domain::types::{EventSeverity, EventType, FinalizeReason, QuestionKind, SessionStatus};
use crate::services::sessions::SessionView;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionStartRequest {
    #[serde(alias = "assignmentId")]
    #[validate(length(min = 1, message = "assignment_id must not be empty"))]
    pub(crate) assignment_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSubmit {
    pub(crate) answer: Answer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventReport {
    #[serde(alias = "eventType")]
    pub(crate) event_type: EventType,
    #[serde(default)]
    pub(crate) metadata: serde_json::Value,
}

/// Option as presented to the student: id and label only, correctness never
/// leaves the server.
#[derive(Debug, Serialize)]
pub(crate) struct OptionView {
    pub(crate) id: String,
    pub(crate) label: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) prompt: String,
    pub(crate) options: Vec<OptionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: u32,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: String,
    pub(crate) expected_end_at: String,
    pub(crate) time_remaining_seconds: i64,
    pub(crate) total_grace_seconds: i64,
    pub(crate) current_question_index: usize,
    pub(crate) answered_count: usize,
    pub(crate) disconnect_count: u32,
    pub(crate) flagged_for_review: bool,
    pub(crate) single_question_mode: bool,
    /// Client-side pacing hint; not enforced by the server.
    pub(crate) per_question_seconds: Option<u32>,
    pub(crate) questions: Vec<QuestionView>,
}

impl SessionResponse {
    /// Questions and options appear in the session's shuffled order.
    pub(crate) fn from_view(view: &SessionView) -> Self {
        let session = &view.session;
        let questions = session
            .question_order
            .iter()
            .filter_map(|question_id| view.assignment.question(question_id))
            .map(|question| {
                let order = session.option_orders.get(&question.id);
                let options = match order {
                    Some(order) => order
                        .iter()
                        .filter_map(|option_id| {
                            question.options.iter().find(|option| &option.id == option_id)
                        })
                        .map(|option| OptionView {
                            id: option.id.clone(),
                            label: option.label.clone(),
                        })
                        .collect(),
                    None => Vec::new(),
                };
                QuestionView {
                    id: question.id.clone(),
                    kind: question.kind,
                    prompt: question.prompt.clone(),
                    options,
                }
            })
            .collect();

        Self {
            id: session.id.clone(),
            assignment_id: session.assignment_id.clone(),
            assignment_title: view.assignment.title.clone(),
            student_id: session.student_id.clone(),
            attempt_number: session.attempt_number,
            status: session.status,
            started_at: format_primitive(session.started_at),
            expected_end_at: format_primitive(session.expected_end_at),
            time_remaining_seconds: session.time_remaining_seconds,
            total_grace_seconds: session.total_grace_seconds,
            current_question_index: session.current_question_index,
            answered_count: session.answered_count(),
            disconnect_count: session.disconnect_count,
            flagged_for_review: session.flagged_for_review,
            single_question_mode: session.anticheat.single_question_mode,
            per_question_seconds: session.anticheat.per_question_seconds,
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckpointResponse {
    pub(crate) session_id: String,
    pub(crate) saved_at: String,
    pub(crate) answered_count: usize,
    pub(crate) time_remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionScoreView {
    pub(crate) question_id: String,
    pub(crate) score: Option<f64>,
    pub(crate) fallback: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeView {
    pub(crate) grade: f64,
    pub(crate) feedback: String,
    pub(crate) requires_manual: bool,
    pub(crate) breakdown: Vec<QuestionScoreView>,
}

impl GradeView {
    fn from_result(result: &GradeResult) -> Self {
        Self {
            grade: result.grade,
            feedback: result.feedback.clone(),
            requires_manual: result.requires_manual,
            breakdown: result
                .breakdown
                .iter()
                .map(|entry| QuestionScoreView {
                    question_id: entry.question_id.clone(),
                    score: entry.score,
                    fallback: entry.fallback,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) assignment_id: String,
    pub(crate) attempt_number: u32,
    pub(crate) reason: FinalizeReason,
    pub(crate) submitted_at: String,
    pub(crate) content_hash: String,
    pub(crate) grade: Option<GradeView>,
}

impl SubmissionResponse {
    pub(crate) fn from_record(record: &SubmissionRecord) -> Self {
        Self {
            id: record.id.clone(),
            session_id: record.session_id.clone(),
            assignment_id: record.assignment_id.clone(),
            attempt_number: record.attempt_number,
            reason: record.reason,
            submitted_at: format_primitive(record.submitted_at),
            content_hash: record.snapshot.content_hash.clone(),
            grade: record.grade.as_ref().map(GradeView::from_result),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EventResponse {
    pub(crate) id: String,
    pub(crate) event_type: EventType,
    pub(crate) severity: EventSeverity,
    pub(crate) metadata: serde_json::Value,
    pub(crate) recorded_at: String,
}

impl EventResponse {
    pub(crate) fn from_event(event: &ExamEvent) -> Self {
        Self {
            id: event.id.clone(),
            event_type: event.event_type,
            severity: event.severity,
            metadata: event.metadata.clone(),
            recorded_at: format_primitive(event.recorded_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SignalResponse {
    pub(crate) accepted: bool,
}
