use thiserror::Error;

/// Engine error taxonomy. Validation errors are surfaced synchronously and
/// never mutate state; grading degradation is not an error (see the
/// `fallback` flag on `QuestionScore`).
#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("maximum attempts reached for this assignment")]
    AttemptLimitExceeded,
    #[error("assignment is not open: {0}")]
    AssignmentNotOpen(String),
    #[error("assignment not found")]
    AssignmentNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("session already finalized")]
    SessionAlreadyFinalized,
    #[error("question '{0}' does not belong to this session")]
    InvalidQuestionReference(String),
    #[error("operation is not legal in the current session state")]
    InvalidTransition,
    #[error("override operations require the teacher role")]
    UnauthorizedOverride,
    #[error("a non-empty justification is required")]
    JustificationRequired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
