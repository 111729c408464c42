use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::Checkpoint;

/// Upsert-by-session-id checkpoint store. Writes are scoped by session id, so
/// no cross-session coordination is needed.
#[async_trait]
pub(crate) trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: Checkpoint) -> anyhow::Result<()>;
    async fn load(&self, session_id: &str) -> Option<Checkpoint>;
}

#[derive(Default)]
pub(crate) struct InMemoryCheckpoints {
    inner: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpoints {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpoints {
    async fn save(&self, checkpoint: Checkpoint) -> anyhow::Result<()> {
        self.inner.write().await.insert(checkpoint.session_id.clone(), checkpoint);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Option<Checkpoint> {
        self.inner.read().await.get(session_id).cloned()
    }
}
