use std::sync::Arc;

use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::domain::models::{ExamEvent, ExamSession};
use crate::domain::types::{EventSeverity, EventType};
use crate::stores::events::EventLog;

/// Records client-reported proctoring signals against the audit log. The
/// policy frozen into the session at start time decides which signals are
/// accepted; signals for disabled detections are dropped silently so stale
/// clients cannot pollute the log.
pub(crate) struct AntiCheatRecorder {
    events: Arc<dyn EventLog>,
}

impl AntiCheatRecorder {
    pub(crate) fn new(events: Arc<dyn EventLog>) -> Self {
        Self { events }
    }

    /// Returns whether the signal was accepted under the session's policy.
    /// Append failures are logged and swallowed; losing one audit entry must
    /// not break the student's exam flow.
    pub(crate) async fn record(
        &self,
        session: &ExamSession,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> bool {
        if !event_type.is_proctor_signal() {
            return false;
        }

        let accepted = match event_type {
            EventType::TabSwitchDetected => session.anticheat.detect_tab_switch,
            EventType::FullscreenExit => session.anticheat.require_fullscreen,
            EventType::CopyPasteAttempt => session.anticheat.disable_copy_paste,
            _ => false,
        };
        if !accepted {
            tracing::debug!(
                session_id = %session.id,
                event_type = ?event_type,
                "Dropping proctor signal for disabled detection"
            );
            return false;
        }

        let event = ExamEvent {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            student_id: session.student_id.clone(),
            attempt_number: session.attempt_number,
            event_type,
            severity: signal_severity(event_type),
            metadata,
            recorded_at: primitive_now_utc(),
        };

        if let Err(err) = self.events.append(event).await {
            tracing::warn!(session_id = %session.id, error = %err, "Failed to append proctor event");
        }
        metrics::counter!("examroom_proctor_signals_total").increment(1);
        true
    }

    /// A session is suspicious when warning-or-worse proctor signals reach
    /// the configured threshold.
    pub(crate) async fn is_suspicious(&self, session: &ExamSession) -> bool {
        let events = self.events.list_for_session(&session.id).await;
        let signals = events
            .iter()
            .filter(|event| {
                event.event_type.is_proctor_signal() && event.severity >= EventSeverity::Warning
            })
            .count() as u32;
        signals >= session.fallback.suspicious_threshold
    }
}

fn signal_severity(event_type: EventType) -> EventSeverity {
    match event_type {
        EventType::TabSwitchDetected | EventType::CopyPasteAttempt => EventSeverity::Warning,
        EventType::FullscreenExit => EventSeverity::Warning,
        _ => EventSeverity::Info,
    }
}
