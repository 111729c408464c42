use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::domain::models::Checkpoint;
use crate::stores::checkpoints::CheckpointStore;

/// Produces the checkpoint to persist, or `None` when the session is not in a
/// checkpointable state (paused, terminal, gone).
#[async_trait]
pub(crate) trait CheckpointSource: Send + Sync {
    async fn checkpoint(&self, session_id: &str) -> Option<Checkpoint>;
}

/// Per-session autosave loop. Saves every `interval_seconds`; an explicit
/// save-now resets the cadence via `notify` so the periodic save does not fire
/// right after a manual one. Save failures are logged and retried on the next
/// tick, never surfaced to the student.
pub(crate) fn spawn(
    session_id: String,
    source: Weak<dyn CheckpointSource>,
    store: Arc<dyn CheckpointStore>,
    notify: Arc<Notify>,
    interval_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(interval_seconds.max(1));
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = notify.notified() => {
                    // The save itself happened on the caller's path.
                    ticker.reset();
                }
                _ = ticker.tick() => {
                    let Some(source) = source.upgrade() else { break };
                    let Some(checkpoint) = source.checkpoint(&session_id).await else {
                        continue;
                    };
                    if let Err(err) = store.save(checkpoint).await {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %err,
                            "Autosave failed; will retry on next tick"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::checkpoints::InMemoryCheckpoints;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedSource {
        remaining: AtomicI64,
    }

    #[async_trait]
    impl CheckpointSource for FixedSource {
        async fn checkpoint(&self, session_id: &str) -> Option<Checkpoint> {
            Some(Checkpoint {
                session_id: session_id.to_string(),
                answers: HashMap::new(),
                current_question_index: 0,
                time_remaining_seconds: self.remaining.fetch_sub(1, Ordering::SeqCst),
                saved_at: crate::core::time::primitive_now_utc(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn saves_on_the_configured_cadence() {
        let source = Arc::new(FixedSource { remaining: AtomicI64::new(600) });
        let store = Arc::new(InMemoryCheckpoints::new());
        let notify = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn(
            "session-1".to_string(),
            Arc::downgrade(&source) as Weak<dyn CheckpointSource>,
            store.clone(),
            notify,
            10,
            shutdown_rx,
        );

        tokio::time::sleep(Duration::from_secs(35)).await;
        shutdown_tx.send(true).expect("shutdown");
        handle.await.expect("autosave task");

        let saved = store.load("session-1").await.expect("checkpoint saved");
        // Three ticks fired (10s, 20s, 30s), so three saves happened.
        assert_eq!(saved.time_remaining_seconds, 598);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_save_resets_the_cadence() {
        let source = Arc::new(FixedSource { remaining: AtomicI64::new(600) });
        let store = Arc::new(InMemoryCheckpoints::new());
        let notify = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn(
            "session-2".to_string(),
            Arc::downgrade(&source) as Weak<dyn CheckpointSource>,
            store.clone(),
            notify.clone(),
            10,
            shutdown_rx,
        );

        // A manual save just before the periodic tick pushes it back.
        tokio::time::sleep(Duration::from_secs(9)).await;
        notify.notify_one();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.load("session-2").await.is_none());

        shutdown_tx.send(true).expect("shutdown");
        handle.await.expect("autosave task");
    }
}
