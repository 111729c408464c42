use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::domain::types::{
    AnticheatPreset, EventSeverity, EventType, FinalizeReason, QuestionKind, SessionStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) label: String,
    pub(crate) correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) prompt: String,
    pub(crate) options: Vec<QuestionOption>,
    /// Accepted strings for fill-blank questions; de-duplicated under the
    /// grading normalization at authoring time.
    pub(crate) accepted_answers: Vec<String>,
}

/// Read-only input from the assignment collaborator. Immutable for the
/// duration of a session; frozen into a `ContentSnapshot` at submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) time_limit_minutes: u32,
    pub(crate) max_attempts: u32,
    pub(crate) open_at: PrimitiveDateTime,
    pub(crate) lock_at: PrimitiveDateTime,
    pub(crate) auto_grade: bool,
    pub(crate) questions: Vec<Question>,
    pub(crate) anticheat: AntiCheatConfig,
    pub(crate) fallback: Option<FallbackConfig>,
}

impl Assignment {
    pub(crate) fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }
}

/// Proctoring policy. Validated on construction and immutable once captured
/// into a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AntiCheatConfig {
    pub(crate) preset: AnticheatPreset,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) single_question_mode: bool,
    pub(crate) require_fullscreen: bool,
    pub(crate) detect_tab_switch: bool,
    pub(crate) disable_copy_paste: bool,
    pub(crate) per_question_seconds: Option<u32>,
}

impl AntiCheatConfig {
    pub(crate) fn basic() -> Self {
        Self {
            preset: AnticheatPreset::Basic,
            shuffle_questions: true,
            shuffle_options: false,
            single_question_mode: false,
            require_fullscreen: false,
            detect_tab_switch: false,
            disable_copy_paste: false,
            per_question_seconds: None,
        }
    }

    pub(crate) fn medium() -> Self {
        Self {
            preset: AnticheatPreset::Medium,
            shuffle_questions: true,
            shuffle_options: true,
            single_question_mode: false,
            require_fullscreen: false,
            detect_tab_switch: true,
            disable_copy_paste: true,
            per_question_seconds: None,
        }
    }

    pub(crate) fn advanced() -> Self {
        Self {
            preset: AnticheatPreset::Advanced,
            shuffle_questions: true,
            shuffle_options: true,
            single_question_mode: true,
            require_fullscreen: true,
            detect_tab_switch: true,
            disable_copy_paste: true,
            per_question_seconds: None,
        }
    }

    pub(crate) fn custom(
        shuffle_questions: bool,
        shuffle_options: bool,
        single_question_mode: bool,
        require_fullscreen: bool,
        detect_tab_switch: bool,
        disable_copy_paste: bool,
        per_question_seconds: Option<u32>,
    ) -> Result<Self, String> {
        if let Some(seconds) = per_question_seconds {
            if seconds == 0 {
                return Err("per_question_seconds must be positive when set".to_string());
            }
        }
        Ok(Self {
            preset: AnticheatPreset::Custom,
            shuffle_questions,
            shuffle_options,
            single_question_mode,
            require_fullscreen,
            detect_tab_switch,
            disable_copy_paste,
            per_question_seconds,
        })
    }
}

/// Grace-period policy effective for one assignment. Consulted by the session
/// manager on every disconnect event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FallbackConfig {
    pub(crate) grace_period_minutes: u64,
    pub(crate) max_reconnects: u32,
    pub(crate) auto_approve_grace: bool,
    pub(crate) auto_save_interval_seconds: u64,
    pub(crate) suspicious_threshold: u32,
    pub(crate) offline_mode: bool,
}

/// A recorded answer. Selected option ids are canonical ids — the client maps
/// shuffled labels back before submitting, which keeps grading
/// shuffle-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub(crate) enum Answer {
    Selected(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: u32,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expected_end_at: PrimitiveDateTime,
    /// Server-authoritative countdown, in seconds.
    pub(crate) time_remaining_seconds: i64,
    pub(crate) total_grace_seconds: i64,
    pub(crate) shuffle_seed: u64,
    /// Permutation of exactly the assignment's question ids; never reshuffled
    /// after creation (teacher reset derives a fresh seed).
    pub(crate) question_order: Vec<String>,
    pub(crate) option_orders: HashMap<String, Vec<String>>,
    pub(crate) answers: HashMap<String, Answer>,
    pub(crate) current_question_index: usize,
    pub(crate) disconnect_count: u32,
    pub(crate) flagged_for_review: bool,
    pub(crate) anticheat: AntiCheatConfig,
    pub(crate) fallback: FallbackConfig,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl ExamSession {
    pub(crate) fn answered_count(&self) -> usize {
        self.answers.len()
    }
}

/// Append-only audit record. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ExamEvent {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: u32,
    pub(crate) event_type: EventType,
    pub(crate) severity: EventSeverity,
    pub(crate) metadata: serde_json::Value,
    pub(crate) recorded_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionScore {
    pub(crate) question_id: String,
    /// Fraction earned in [0, 1]; `None` for essays pending manual grading.
    pub(crate) score: Option<f64>,
    /// Set when the grading error boundary degraded this question to zero
    /// credit instead of aborting the whole computation.
    pub(crate) fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GradeResult {
    /// 0–10 scale, rounded to one decimal.
    pub(crate) grade: f64,
    pub(crate) feedback: String,
    pub(crate) breakdown: Vec<QuestionScore>,
    pub(crate) requires_manual: bool,
}

/// Frozen copy of question/option content and correctness exactly as graded,
/// keyed by a content hash so later edits to the question bank cannot change
/// what a historical submission was graded against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ContentSnapshot {
    pub(crate) content_hash: String,
    pub(crate) questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Checkpoint {
    pub(crate) session_id: String,
    pub(crate) answers: HashMap<String, Answer>,
    pub(crate) current_question_index: usize,
    pub(crate) time_remaining_seconds: i64,
    pub(crate) saved_at: PrimitiveDateTime,
}

/// What the submission store collaborator receives on finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubmissionRecord {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) assignment_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: u32,
    pub(crate) reason: FinalizeReason,
    pub(crate) answers: HashMap<String, Answer>,
    pub(crate) grade: Option<GradeResult>,
    pub(crate) snapshot: ContentSnapshot,
    pub(crate) submitted_at: PrimitiveDateTime,
}
