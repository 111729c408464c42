use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::Assignment;

/// The assignment collaborator. Question lists, ground truth, windows and
/// anti-cheat policy come from here; the engine treats them as read-only.
#[async_trait]
pub(crate) trait AssignmentProvider: Send + Sync {
    async fn fetch(&self, assignment_id: &str) -> Option<Arc<Assignment>>;
}

#[derive(Default)]
pub(crate) struct InMemoryAssignments {
    inner: RwLock<HashMap<String, Arc<Assignment>>>,
}

impl InMemoryAssignments {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, assignment: Assignment) {
        self.inner.write().await.insert(assignment.id.clone(), Arc::new(assignment));
    }
}

#[async_trait]
impl AssignmentProvider for InMemoryAssignments {
    async fn fetch(&self, assignment_id: &str) -> Option<Arc<Assignment>> {
        self.inner.read().await.get(assignment_id).cloned()
    }
}
