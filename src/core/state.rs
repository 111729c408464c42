use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::overrides::OverrideController;
use crate::services::sessions::SessionManager;
use crate::stores::assignments::InMemoryAssignments;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    sessions: Arc<SessionManager>,
    overrides: OverrideController,
    assignments: Arc<InMemoryAssignments>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        sessions: Arc<SessionManager>,
        assignments: Arc<InMemoryAssignments>,
    ) -> Self {
        let overrides = OverrideController::new(sessions.clone());
        Self { inner: Arc::new(InnerState { settings, sessions, overrides, assignments }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn sessions(&self) -> &Arc<SessionManager> {
        &self.inner.sessions
    }

    pub(crate) fn overrides(&self) -> &OverrideController {
        &self.inner.overrides
    }

    pub(crate) fn assignments(&self) -> &Arc<InMemoryAssignments> {
        &self.inner.assignments
    }
}
