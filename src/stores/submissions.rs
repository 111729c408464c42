use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::SubmissionRecord;

/// The submission store collaborator. Also serves the attempt-limit check:
/// the count of prior submissions per (assignment, student).
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn persist(&self, record: SubmissionRecord) -> anyhow::Result<()>;
    async fn attempt_count(&self, assignment_id: &str, student_id: &str) -> u32;
    async fn find_by_session(&self, session_id: &str) -> Option<SubmissionRecord>;
}

#[derive(Default)]
pub(crate) struct InMemorySubmissions {
    inner: RwLock<HashMap<String, Vec<SubmissionRecord>>>,
}

impl InMemorySubmissions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn key(assignment_id: &str, student_id: &str) -> String {
        format!("{assignment_id}:{student_id}")
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissions {
    async fn persist(&self, record: SubmissionRecord) -> anyhow::Result<()> {
        let key = Self::key(&record.assignment_id, &record.student_id);
        let mut inner = self.inner.write().await;
        let records = inner.entry(key).or_default();
        // Resubmission replaces the record wholesale, never patches it.
        records.retain(|existing| existing.session_id != record.session_id);
        records.push(record);
        Ok(())
    }

    async fn attempt_count(&self, assignment_id: &str, student_id: &str) -> u32 {
        let key = Self::key(assignment_id, student_id);
        self.inner.read().await.get(&key).map(|records| records.len() as u32).unwrap_or(0)
    }

    async fn find_by_session(&self, session_id: &str) -> Option<SubmissionRecord> {
        self.inner
            .read()
            .await
            .values()
            .flatten()
            .find(|record| record.session_id == session_id)
            .cloned()
    }
}
