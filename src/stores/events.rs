use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::ExamEvent;

/// Append-only audit log. Events within one session are observed in append
/// order; no ordering is guaranteed across sessions.
#[async_trait]
pub(crate) trait EventLog: Send + Sync {
    async fn append(&self, event: ExamEvent) -> anyhow::Result<()>;
    async fn list_for_session(&self, session_id: &str) -> Vec<ExamEvent>;
}

#[derive(Default)]
pub(crate) struct InMemoryEventLog {
    inner: RwLock<HashMap<String, Vec<ExamEvent>>>,
}

impl InMemoryEventLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: ExamEvent) -> anyhow::Result<()> {
        self.inner.write().await.entry(event.session_id.clone()).or_default().push(event);
        Ok(())
    }

    async fn list_for_session(&self, session_id: &str) -> Vec<ExamEvent> {
        self.inner.read().await.get(session_id).cloned().unwrap_or_default()
    }
}
