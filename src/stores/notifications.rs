use async_trait::async_trait;

use crate::domain::models::SubmissionRecord;

/// Fire-and-forget notification collaborator, pinged when a submission needs
/// manual grading. Failures must never surface to the student flow.
#[async_trait]
pub(crate) trait Notifier: Send + Sync {
    async fn manual_grading_required(&self, record: &SubmissionRecord);
}

pub(crate) struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn manual_grading_required(&self, record: &SubmissionRecord) {
        tracing::info!(
            submission_id = %record.id,
            assignment_id = %record.assignment_id,
            student_id = %record.student_id,
            "Submission awaiting manual grading"
        );
    }
}
