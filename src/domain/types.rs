use serde::{Deserialize, Serialize};

/// `NOT_STARTED` is the precondition for `start_session` and is never
/// persisted, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SessionStatus {
    InProgress,
    Paused,
    Completed,
    Terminated,
}

impl SessionStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Terminated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuestionKind {
    Single,
    Multiple,
    TrueFalse,
    FillBlank,
    Essay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinalizeReason {
    ManualSubmit,
    TimeExpired,
    TeacherTerminated,
}

impl FinalizeReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            FinalizeReason::ManualSubmit => "manual_submit",
            FinalizeReason::TimeExpired => "time_expired",
            FinalizeReason::TeacherTerminated => "teacher_terminated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum EventType {
    SessionStarted,
    SessionCompleted,
    SessionReset,
    TabSwitchDetected,
    FullscreenExit,
    CopyPasteAttempt,
    DisconnectDetected,
    DisconnectFlagged,
    TimeExtended,
    GracePeriodApproved,
}

impl EventType {
    /// Proctoring signals reported by the client, as opposed to lifecycle
    /// events appended by the engine itself.
    pub(crate) fn is_proctor_signal(self) -> bool {
        matches!(
            self,
            EventType::TabSwitchDetected
                | EventType::FullscreenExit
                | EventType::CopyPasteAttempt
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EventSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AnticheatPreset {
    Basic,
    Medium,
    Advanced,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Teacher,
    Student,
}
