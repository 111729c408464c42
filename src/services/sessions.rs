use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;
use tokio::sync::{watch, Mutex, Notify, RwLock};
use uuid::Uuid;

use crate::core::time::{format_primitive, primitive_now_utc};
use crate::domain::models::{
    Answer, Assignment, Checkpoint, ExamEvent, ExamSession, FallbackConfig, SubmissionRecord,
};
use crate::domain::types::{EventSeverity, EventType, FinalizeReason, SessionStatus};
use crate::services::anticheat::AntiCheatRecorder;
use crate::services::autosave::{self, CheckpointSource};
use crate::services::errors::EngineError;
use crate::services::grading;
use crate::services::shuffle;
use crate::services::snapshot::build_snapshot;
use crate::services::timer::{self, ClockSink, Tick, WARNING_POINTS};
use crate::stores::assignments::AssignmentProvider;
use crate::stores::checkpoints::CheckpointStore;
use crate::stores::events::EventLog;
use crate::stores::notifications::Notifier;
use crate::stores::submissions::SubmissionStore;

/// The engine's collaborators, injected at startup.
pub(crate) struct EngineStores {
    pub(crate) assignments: Arc<dyn AssignmentProvider>,
    pub(crate) checkpoints: Arc<dyn CheckpointStore>,
    pub(crate) events: Arc<dyn EventLog>,
    pub(crate) submissions: Arc<dyn SubmissionStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

struct SessionCell {
    state: Mutex<SessionState>,
}

/// All mutable state of one live session. Guarded by the cell mutex, so
/// operations within a session are serialized while distinct sessions proceed
/// in parallel.
struct SessionState {
    session: ExamSession,
    assignment: Arc<Assignment>,
    shutdown: watch::Sender<bool>,
    save_now: Arc<Notify>,
    /// Seconds of grace pause left before the countdown resumes on its own.
    pause_grace_remaining: Option<i64>,
    /// Cached finalize outcome; makes repeat submits idempotent.
    submission: Option<SubmissionRecord>,
}

impl SessionState {
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            session_id: self.session.id.clone(),
            answers: self.session.answers.clone(),
            current_question_index: self.session.current_question_index,
            time_remaining_seconds: self.session.time_remaining_seconds,
            saved_at: primitive_now_utc(),
        }
    }
}

/// Read view handed to the API layer: the session plus the assignment it runs
/// against.
pub(crate) struct SessionView {
    pub(crate) session: ExamSession,
    pub(crate) assignment: Arc<Assignment>,
}

/// Owns every live session in the process. The registry maps session id to a
/// cell; per-session countdown and autosave tasks hold only a `Weak` back to
/// the manager so dropping it stops them.
pub(crate) struct SessionManager {
    stores: EngineStores,
    recorder: AntiCheatRecorder,
    defaults: FallbackConfig,
    registry: RwLock<HashMap<String, Arc<SessionCell>>>,
}

impl SessionManager {
    pub(crate) fn new(stores: EngineStores, defaults: FallbackConfig) -> Self {
        let recorder = AntiCheatRecorder::new(stores.events.clone());
        Self { stores, recorder, defaults, registry: RwLock::new(HashMap::new()) }
    }

    async fn cell(&self, session_id: &str) -> Option<Arc<SessionCell>> {
        self.registry.read().await.get(session_id).cloned()
    }

    async fn require_cell(&self, session_id: &str) -> Result<Arc<SessionCell>, EngineError> {
        self.cell(session_id).await.ok_or(EngineError::SessionNotFound)
    }

    /// Starts a new attempt, or returns the student's already-live session
    /// for this assignment so a duplicate start after a flaky request does
    /// not burn an attempt.
    pub(crate) async fn start_session(
        self: &Arc<Self>,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<ExamSession, EngineError> {
        let assignment = self
            .stores
            .assignments
            .fetch(assignment_id)
            .await
            .ok_or(EngineError::AssignmentNotFound)?;

        let now = primitive_now_utc();
        if now < assignment.open_at {
            return Err(EngineError::AssignmentNotOpen(format!(
                "opens at {}",
                format_primitive(assignment.open_at)
            )));
        }
        if now >= assignment.lock_at {
            return Err(EngineError::AssignmentNotOpen(format!(
                "locked since {}",
                format_primitive(assignment.lock_at)
            )));
        }

        if let Some(existing) = self.live_session_for(assignment_id, student_id).await {
            return Ok(existing);
        }

        let prior_attempts =
            self.stores.submissions.attempt_count(assignment_id, student_id).await;
        if prior_attempts >= assignment.max_attempts {
            return Err(EngineError::AttemptLimitExceeded);
        }

        let seed = shuffle::new_seed();
        let order = shuffle::shuffle_assignment(&assignment, &assignment.anticheat, seed);
        let fallback = assignment.fallback.clone().unwrap_or_else(|| self.defaults.clone());
        let time_limit_seconds = i64::from(assignment.time_limit_minutes) * 60;

        let session = ExamSession {
            id: Uuid::new_v4().to_string(),
            assignment_id: assignment.id.clone(),
            student_id: student_id.to_string(),
            attempt_number: prior_attempts + 1,
            status: SessionStatus::InProgress,
            started_at: now,
            expected_end_at: now + Duration::seconds(time_limit_seconds),
            time_remaining_seconds: time_limit_seconds,
            total_grace_seconds: 0,
            shuffle_seed: seed,
            question_order: order.question_order,
            option_orders: order.option_orders,
            answers: HashMap::new(),
            current_question_index: 0,
            disconnect_count: 0,
            flagged_for_review: false,
            anticheat: assignment.anticheat.clone(),
            fallback,
            updated_at: now,
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let save_now = Arc::new(Notify::new());
        let state = SessionState {
            session: session.clone(),
            assignment,
            shutdown,
            save_now: save_now.clone(),
            pause_grace_remaining: None,
            submission: None,
        };
        let interval = state.session.fallback.auto_save_interval_seconds;
        self.registry
            .write()
            .await
            .insert(session.id.clone(), Arc::new(SessionCell { state: Mutex::new(state) }));

        self.spawn_tasks(&session.id, save_now, interval, shutdown_rx);

        self.append_event(
            &session,
            EventType::SessionStarted,
            EventSeverity::Info,
            serde_json::json!({ "attempt": session.attempt_number }),
        )
        .await;
        metrics::counter!("examroom_sessions_started_total").increment(1);
        metrics::gauge!("examroom_active_sessions").increment(1.0);

        tracing::info!(
            session_id = %session.id,
            assignment_id = %session.assignment_id,
            student_id = %session.student_id,
            attempt = session.attempt_number,
            "Session started"
        );
        Ok(session)
    }

    fn spawn_tasks(
        self: &Arc<Self>,
        session_id: &str,
        save_now: Arc<Notify>,
        interval_seconds: u64,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        let clock = Arc::downgrade(self) as std::sync::Weak<dyn ClockSink>;
        let _ = timer::spawn(session_id.to_string(), clock, shutdown_rx.clone());

        let source = Arc::downgrade(self) as std::sync::Weak<dyn CheckpointSource>;
        let _ = autosave::spawn(
            session_id.to_string(),
            source,
            self.stores.checkpoints.clone(),
            save_now,
            interval_seconds,
            shutdown_rx,
        );
    }

    async fn live_session_for(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> Option<ExamSession> {
        let registry = self.registry.read().await;
        for cell in registry.values() {
            let state = cell.state.lock().await;
            if state.session.assignment_id == assignment_id
                && state.session.student_id == student_id
                && !state.session.status.is_terminal()
            {
                return Some(state.session.clone());
            }
        }
        None
    }

    pub(crate) async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<SessionView, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let state = cell.state.lock().await;
        Ok(SessionView { session: state.session.clone(), assignment: state.assignment.clone() })
    }

    /// Records or overwrites one answer. Single-question mode forbids moving
    /// the cursor backwards; re-answering the current question is allowed.
    pub(crate) async fn record_answer(
        &self,
        session_id: &str,
        question_id: &str,
        answer: Answer,
    ) -> Result<ExamSession, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;

        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }
        if state.session.status == SessionStatus::Paused && !state.session.fallback.offline_mode {
            return Err(EngineError::InvalidTransition);
        }

        let position = state
            .session
            .question_order
            .iter()
            .position(|id| id == question_id)
            .ok_or_else(|| EngineError::InvalidQuestionReference(question_id.to_string()))?;

        if state.session.anticheat.single_question_mode
            && position < state.session.current_question_index
        {
            return Err(EngineError::InvalidTransition);
        }

        state.session.answers.insert(question_id.to_string(), answer);
        state.session.current_question_index =
            state.session.current_question_index.max(position);
        state.session.updated_at = primitive_now_utc();
        Ok(state.session.clone())
    }

    /// Explicit checkpoint on the caller's path. Also resets the autosave
    /// cadence so the periodic save does not fire right behind it.
    pub(crate) async fn save_now(&self, session_id: &str) -> Result<Checkpoint, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let state = cell.state.lock().await;
        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }
        let checkpoint = state.checkpoint();
        self.stores.checkpoints.save(checkpoint.clone()).await?;
        state.save_now.notify_one();
        Ok(checkpoint)
    }

    /// Client lost its connection. Counts the drop, pauses the countdown when
    /// the grace policy auto-approves, and flags the session once reconnects
    /// exceed the allowance. A no-op on finalized sessions: a late disconnect
    /// report must not error after submission.
    pub(crate) async fn register_disconnect(
        &self,
        session_id: &str,
    ) -> Result<ExamSession, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;
        if state.session.status.is_terminal() {
            return Ok(state.session.clone());
        }

        state.session.disconnect_count += 1;
        state.session.updated_at = primitive_now_utc();
        let session_snapshot = state.session.clone();
        self.append_event(
            &session_snapshot,
            EventType::DisconnectDetected,
            EventSeverity::Warning,
            serde_json::json!({ "disconnect_count": session_snapshot.disconnect_count }),
        )
        .await;

        if state.session.disconnect_count > state.session.fallback.max_reconnects
            && !state.session.flagged_for_review
        {
            state.session.flagged_for_review = true;
            let flagged = state.session.clone();
            self.append_event(
                &flagged,
                EventType::DisconnectFlagged,
                EventSeverity::Critical,
                serde_json::json!({
                    "disconnect_count": flagged.disconnect_count,
                    "max_reconnects": flagged.fallback.max_reconnects,
                }),
            )
            .await;
            tracing::warn!(
                session_id = %flagged.id,
                disconnects = flagged.disconnect_count,
                "Session flagged for review after repeated disconnects"
            );
        }

        if state.session.fallback.auto_approve_grace
            && state.session.status == SessionStatus::InProgress
        {
            state.session.status = SessionStatus::Paused;
            state.pause_grace_remaining =
                Some(state.session.fallback.grace_period_minutes as i64 * 60);
        }

        // Checkpoint immediately so a crash during the outage loses nothing.
        if let Err(err) = self.stores.checkpoints.save(state.checkpoint()).await {
            tracing::warn!(session_id = %session_id, error = %err, "Disconnect checkpoint failed");
        }

        Ok(state.session.clone())
    }

    /// Client came back. Resumes a grace-paused countdown; idempotent when
    /// the session never paused.
    pub(crate) async fn reconnect(&self, session_id: &str) -> Result<ExamSession, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;
        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }
        if state.session.status == SessionStatus::Paused {
            state.session.status = SessionStatus::InProgress;
            state.pause_grace_remaining = None;
            state.session.updated_at = primitive_now_utc();
            tracing::info!(session_id = %session_id, "Session resumed after reconnect");
        }
        Ok(state.session.clone())
    }

    /// Proctoring signal from the client. Accepted signals may tip the
    /// session over the suspicion threshold, which flags it for review.
    pub(crate) async fn record_signal(
        &self,
        session_id: &str,
        event_type: EventType,
        metadata: serde_json::Value,
    ) -> Result<bool, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;
        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }

        let accepted = self.recorder.record(&state.session, event_type, metadata).await;
        if accepted
            && !state.session.flagged_for_review
            && self.recorder.is_suspicious(&state.session).await
        {
            state.session.flagged_for_review = true;
            tracing::warn!(
                session_id = %session_id,
                "Session flagged for review after repeated proctor signals"
            );
        }
        Ok(accepted)
    }

    pub(crate) async fn events(
        &self,
        session_id: &str,
    ) -> Result<Vec<ExamEvent>, EngineError> {
        self.require_cell(session_id).await?;
        Ok(self.stores.events.list_for_session(session_id).await)
    }

    /// Finalizes the session: freezes the clock, snapshots content, grades
    /// when auto-grading is on and hands the record to the submission store.
    /// Idempotent: a repeat call returns the cached record unchanged.
    pub(crate) async fn finalize(
        &self,
        session_id: &str,
        reason: FinalizeReason,
    ) -> Result<SubmissionRecord, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;

        if let Some(existing) = &state.submission {
            return Ok(existing.clone());
        }
        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }

        state.session.status = match reason {
            FinalizeReason::TeacherTerminated => SessionStatus::Terminated,
            _ => SessionStatus::Completed,
        };
        state.session.updated_at = primitive_now_utc();
        let _ = state.shutdown.send(true);

        let snapshot = build_snapshot(&state.assignment)?;
        let grade = state
            .assignment
            .auto_grade
            .then(|| grading::grade(&snapshot.questions, &state.session.answers));

        let record = SubmissionRecord {
            id: Uuid::new_v4().to_string(),
            session_id: state.session.id.clone(),
            assignment_id: state.session.assignment_id.clone(),
            student_id: state.session.student_id.clone(),
            attempt_number: state.session.attempt_number,
            reason,
            answers: state.session.answers.clone(),
            grade,
            snapshot,
            submitted_at: state.session.updated_at,
        };

        // The student already has their outcome; a store failure is an
        // operational problem, not theirs.
        if let Err(err) = self.stores.submissions.persist(record.clone()).await {
            tracing::error!(
                session_id = %record.session_id,
                error = %err,
                "Failed to persist submission"
            );
        }

        let session_snapshot = state.session.clone();
        self.append_event(
            &session_snapshot,
            EventType::SessionCompleted,
            EventSeverity::Info,
            serde_json::json!({ "reason": reason.as_str() }),
        )
        .await;
        metrics::counter!("examroom_sessions_finalized_total", "reason" => reason.as_str())
            .increment(1);
        metrics::gauge!("examroom_active_sessions").decrement(1.0);

        if record.grade.as_ref().map(|result| result.requires_manual).unwrap_or(false)
            || !state.assignment.auto_grade
        {
            self.stores.notifier.manual_grading_required(&record).await;
        }

        tracing::info!(
            session_id = %record.session_id,
            reason = reason.as_str(),
            grade = ?record.grade.as_ref().map(|result| result.grade),
            "Session finalized"
        );

        state.submission = Some(record.clone());
        Ok(record)
    }

    /// Teacher override: more time. Allowed while the session is live; the
    /// countdown picks the new remainder up on its next tick, and any warning
    /// point crossed again fires again.
    pub(crate) async fn extend_time(
        &self,
        session_id: &str,
        minutes: u32,
        actor_id: &str,
        reason: &str,
    ) -> Result<ExamSession, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;
        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }

        let extra = i64::from(minutes) * 60;
        state.session.time_remaining_seconds += extra;
        state.session.expected_end_at += Duration::seconds(extra);
        state.session.updated_at = primitive_now_utc();

        let session_snapshot = state.session.clone();
        self.append_event(
            &session_snapshot,
            EventType::TimeExtended,
            EventSeverity::Info,
            serde_json::json!({ "minutes": minutes, "actor": actor_id, "reason": reason }),
        )
        .await;
        Ok(state.session.clone())
    }

    /// Teacher override: grant grace seconds on top of the remaining time
    /// and resume a paused countdown.
    pub(crate) async fn approve_grace(
        &self,
        session_id: &str,
        seconds: i64,
        actor_id: &str,
        reason: &str,
    ) -> Result<ExamSession, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;
        if state.session.status.is_terminal() {
            return Err(EngineError::SessionAlreadyFinalized);
        }

        state.session.total_grace_seconds += seconds;
        state.session.time_remaining_seconds += seconds;
        state.session.expected_end_at += Duration::seconds(seconds);
        if state.session.status == SessionStatus::Paused {
            state.session.status = SessionStatus::InProgress;
            state.pause_grace_remaining = None;
        }
        state.session.updated_at = primitive_now_utc();

        let session_snapshot = state.session.clone();
        self.append_event(
            &session_snapshot,
            EventType::GracePeriodApproved,
            EventSeverity::Info,
            serde_json::json!({ "seconds": seconds, "actor": actor_id, "reason": reason }),
        )
        .await;
        Ok(state.session.clone())
    }

    /// Teacher override: wipe the attempt and restart it with a fresh clock
    /// and a fresh shuffle. Allowed on live and completed sessions, not on
    /// terminated ones.
    pub(crate) async fn reset_session(
        self: &Arc<Self>,
        session_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<ExamSession, EngineError> {
        let cell = self.require_cell(session_id).await?;
        let mut state = cell.state.lock().await;
        if state.session.status == SessionStatus::Terminated {
            return Err(EngineError::InvalidTransition);
        }

        let _ = state.shutdown.send(true);

        // A completed session left the active pool at finalize; reset puts
        // it back.
        if state.session.status.is_terminal() {
            metrics::gauge!("examroom_active_sessions").increment(1.0);
        }

        let now = primitive_now_utc();
        let seed = shuffle::new_seed();
        let order = shuffle::shuffle_assignment(&state.assignment, &state.session.anticheat, seed);
        let time_limit_seconds = i64::from(state.assignment.time_limit_minutes) * 60;

        state.session.status = SessionStatus::InProgress;
        state.session.started_at = now;
        state.session.expected_end_at = now + Duration::seconds(time_limit_seconds);
        state.session.time_remaining_seconds = time_limit_seconds;
        state.session.total_grace_seconds = 0;
        state.session.shuffle_seed = seed;
        state.session.question_order = order.question_order;
        state.session.option_orders = order.option_orders;
        state.session.answers.clear();
        state.session.current_question_index = 0;
        state.session.disconnect_count = 0;
        state.session.updated_at = now;
        state.pause_grace_remaining = None;
        state.submission = None;

        let (shutdown, shutdown_rx) = watch::channel(false);
        state.shutdown = shutdown;
        let save_now = Arc::new(Notify::new());
        state.save_now = save_now.clone();
        let interval = state.session.fallback.auto_save_interval_seconds;
        self.spawn_tasks(session_id, save_now, interval, shutdown_rx);

        let session_snapshot = state.session.clone();
        self.append_event(
            &session_snapshot,
            EventType::SessionReset,
            EventSeverity::Warning,
            serde_json::json!({ "actor": actor_id, "reason": reason }),
        )
        .await;
        tracing::info!(session_id = %session_id, actor = %actor_id, "Session reset");
        Ok(state.session.clone())
    }

    pub(crate) async fn list_sessions(
        &self,
        assignment_id: Option<&str>,
    ) -> Vec<ExamSession> {
        let registry = self.registry.read().await;
        let mut sessions = Vec::with_capacity(registry.len());
        for cell in registry.values() {
            let state = cell.state.lock().await;
            if assignment_id.map(|id| state.session.assignment_id == id).unwrap_or(true) {
                sessions.push(state.session.clone());
            }
        }
        sessions.sort_by(|lhs, rhs| lhs.started_at.cmp(&rhs.started_at));
        sessions
    }

    pub(crate) async fn submission_for(&self, session_id: &str) -> Option<SubmissionRecord> {
        self.stores.submissions.find_by_session(session_id).await
    }

    async fn append_event(
        &self,
        session: &ExamSession,
        event_type: EventType,
        severity: EventSeverity,
        metadata: serde_json::Value,
    ) {
        let event = ExamEvent {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            student_id: session.student_id.clone(),
            attempt_number: session.attempt_number,
            event_type,
            severity,
            metadata,
            recorded_at: primitive_now_utc(),
        };
        if let Err(err) = self.stores.events.append(event).await {
            tracing::warn!(
                session_id = %session.id,
                event_type = ?event_type,
                error = %err,
                "Failed to append lifecycle event"
            );
        }
    }
}

#[async_trait]
impl ClockSink for SessionManager {
    async fn tick(&self, session_id: &str) -> Tick {
        let Some(cell) = self.cell(session_id).await else { return Tick::Detached };
        let mut state = cell.state.lock().await;

        if state.session.status.is_terminal() {
            return Tick::Detached;
        }

        if state.session.status == SessionStatus::Paused {
            // Grace pause burns its own budget, not exam time.
            if let Some(grace) = state.pause_grace_remaining.as_mut() {
                *grace -= 1;
                if *grace <= 0 {
                    state.pause_grace_remaining = None;
                    state.session.status = SessionStatus::InProgress;
                    tracing::info!(
                        session_id = %session_id,
                        "Grace period exhausted; countdown resumed"
                    );
                }
            }
            return Tick::Running(state.session.time_remaining_seconds);
        }

        state.session.time_remaining_seconds -= 1;
        let remaining = state.session.time_remaining_seconds;
        if remaining <= 0 {
            Tick::Expired
        } else if WARNING_POINTS.contains(&remaining) {
            Tick::Warning(remaining)
        } else {
            Tick::Running(remaining)
        }
    }

    async fn expired(&self, session_id: &str) {
        if let Err(err) = self.finalize(session_id, FinalizeReason::TimeExpired).await {
            tracing::error!(
                session_id = %session_id,
                error = %err,
                "Auto-submit on expiry failed"
            );
        }
    }
}

#[async_trait]
impl CheckpointSource for SessionManager {
    async fn checkpoint(&self, session_id: &str) -> Option<Checkpoint> {
        let cell = self.cell(session_id).await?;
        let state = cell.state.lock().await;
        if state.session.status != SessionStatus::InProgress {
            return None;
        }
        Some(state.checkpoint())
    }
}
