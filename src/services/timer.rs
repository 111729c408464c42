use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Remaining-second marks at which `Tick::Warning` is reported. Extending
/// time past a mark re-arms it.
pub(crate) const WARNING_POINTS: [i64; 3] = [300, 60, 10];

/// Outcome of one countdown second, decided by the clock owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Countdown continues (or is frozen while paused).
    Running(i64),
    /// Countdown crossed a warning point.
    Warning(i64),
    /// Countdown hit zero; the sink's `expired` hook must fire exactly once.
    Expired,
    /// The session is gone or terminal; the timer should stop.
    Detached,
}

#[async_trait]
pub(crate) trait ClockSink: Send + Sync {
    async fn tick(&self, session_id: &str) -> Tick;
    async fn expired(&self, session_id: &str);
}

/// Owned per-session countdown task at 1 s resolution. Stops when the
/// session's shutdown channel fires, when the sink reports a terminal state,
/// or after expiry has been delivered.
pub(crate) fn spawn(
    session_id: String,
    sink: Weak<dyn ClockSink>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let Some(sink) = sink.upgrade() else { break };
                    match sink.tick(&session_id).await {
                        Tick::Running(_) => {}
                        Tick::Warning(remaining) => {
                            tracing::info!(session_id = %session_id, remaining, "Time warning");
                        }
                        Tick::Expired => {
                            sink.expired(&session_id).await;
                            break;
                        }
                        Tick::Detached => break,
                    }
                }
            }
        }
    })
}
