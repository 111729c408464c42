pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod domain;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod stores;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::sessions::{EngineStores, SessionManager};
use crate::stores::assignments::InMemoryAssignments;
use crate::stores::checkpoints::InMemoryCheckpoints;
use crate::stores::events::InMemoryEventLog;
use crate::stores::notifications::LogNotifier;
use crate::stores::submissions::InMemorySubmissions;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let assignments = Arc::new(InMemoryAssignments::new());
    let engine_stores = EngineStores {
        assignments: assignments.clone(),
        checkpoints: Arc::new(InMemoryCheckpoints::new()),
        events: Arc::new(InMemoryEventLog::new()),
        submissions: Arc::new(InMemorySubmissions::new()),
        notifier: Arc::new(LogNotifier),
    };
    let sessions =
        Arc::new(SessionManager::new(engine_stores, settings.fallback().to_config()));

    let state = AppState::new(settings, sessions, assignments);
    if let Err(err) = core::bootstrap::ensure_assignments(&state).await {
        tracing::error!(error = %err, "Failed to load assignments");
    }
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Examroom API listening"
    );

    axum::serve(listener, axum::ServiceExt::<axum::extract::Request>::into_make_service(app))
        .with_graceful_shutdown(core::shutdown::shutdown_signal())
        .await?;

    Ok(())
}
