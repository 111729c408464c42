use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_http::normalize_path::NormalizePath;

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::domain::types::UserRole;
use crate::services::sessions::{EngineStores, SessionManager};
use crate::stores::assignments::InMemoryAssignments;
use crate::stores::checkpoints::InMemoryCheckpoints;
use crate::stores::events::InMemoryEventLog;
use crate::stores::notifications::LogNotifier;
use crate::stores::submissions::InMemorySubmissions;

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: NormalizePath<Router>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("EXAMROOM_ENV", "test");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("AUTO_SAVE_INTERVAL_SECONDS", "10");
    std::env::set_var("SUSPICIOUS_THRESHOLD", "3");
    std::env::set_var("MAX_RECONNECTS", "3");
    std::env::set_var("GRACE_PERIOD_MINUTES", "5");
    std::env::remove_var("BACKEND_CORS_ORIGINS");
}

/// Router plus state over fresh in-memory stores, with one open assignment
/// ("quiz-1") seeded.
pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let assignments = Arc::new(InMemoryAssignments::new());
    assignments.insert(fixtures::assignment("quiz-1", fixtures::mixed_questions())).await;

    let engine_stores = EngineStores {
        assignments: assignments.clone(),
        checkpoints: Arc::new(InMemoryCheckpoints::new()),
        events: Arc::new(InMemoryEventLog::new()),
        submissions: Arc::new(InMemorySubmissions::new()),
        notifier: Arc::new(LogNotifier),
    };
    let sessions = Arc::new(SessionManager::new(engine_stores, settings.fallback().to_config()));

    let state = AppState::new(settings, sessions, assignments);
    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    user: Option<(&str, UserRole)>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some((user_id, role)) = user {
        let role = match role {
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        };
        builder = builder
            .header(api::guards::USER_ID_HEADER, user_id)
            .header(api::guards::USER_ROLE_HEADER, role);
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}

pub(crate) mod fixtures {
    use std::collections::HashMap;

    use time::Duration;

    use crate::core::time::primitive_now_utc;
    use crate::domain::models::{
        Answer, AntiCheatConfig, Assignment, ExamSession, FallbackConfig, Question, QuestionOption,
    };
    use crate::domain::types::{QuestionKind, SessionStatus};

    pub(crate) fn fallback() -> FallbackConfig {
        FallbackConfig {
            grace_period_minutes: 5,
            max_reconnects: 3,
            auto_approve_grace: true,
            auto_save_interval_seconds: 10,
            suspicious_threshold: 3,
            offline_mode: false,
        }
    }

    /// An assignment whose window is open right now: 30 minutes of exam
    /// time, two attempts, auto-grading on.
    pub(crate) fn assignment(id: &str, questions: Vec<Question>) -> Assignment {
        let now = primitive_now_utc();
        Assignment {
            id: id.to_string(),
            title: format!("Assignment {id}"),
            time_limit_minutes: 30,
            max_attempts: 2,
            open_at: now - Duration::hours(1),
            lock_at: now + Duration::hours(1),
            auto_grade: true,
            questions,
            anticheat: AntiCheatConfig::medium(),
            fallback: None,
        }
    }

    fn option(question_id: &str, suffix: &str, label: &str, correct: bool) -> QuestionOption {
        QuestionOption {
            id: format!("{question_id}-{suffix}"),
            label: label.to_string(),
            correct,
        }
    }

    /// One question of each kind. Option ids are `<question>-a` and so on;
    /// `answer_for` relies on that to produce a valid answer for any of them.
    pub(crate) fn mixed_questions() -> Vec<Question> {
        vec![
            Question {
                id: "single-1".to_string(),
                kind: QuestionKind::Single,
                prompt: "Which planet is closest to the sun?".to_string(),
                options: vec![
                    option("single-1", "a", "Mercury", true),
                    option("single-1", "b", "Venus", false),
                    option("single-1", "c", "Mars", false),
                ],
                accepted_answers: vec![],
            },
            Question {
                id: "multi-1".to_string(),
                kind: QuestionKind::Multiple,
                prompt: "Which of these are noble gases?".to_string(),
                options: vec![
                    option("multi-1", "a", "Helium", true),
                    option("multi-1", "b", "Neon", true),
                    option("multi-1", "c", "Nitrogen", false),
                    option("multi-1", "d", "Hydrogen", false),
                ],
                accepted_answers: vec![],
            },
            Question {
                id: "tf-1".to_string(),
                kind: QuestionKind::TrueFalse,
                prompt: "Sound travels faster in water than in air.".to_string(),
                options: vec![
                    option("tf-1", "a", "True", true),
                    option("tf-1", "b", "False", false),
                ],
                accepted_answers: vec![],
            },
            Question {
                id: "fill-1".to_string(),
                kind: QuestionKind::FillBlank,
                prompt: "Photosynthesis releases which gas?".to_string(),
                options: vec![],
                accepted_answers: vec!["oxygen".to_string(), "O2".to_string()],
            },
            Question {
                id: "essay-1".to_string(),
                kind: QuestionKind::Essay,
                prompt: "Explain why the sky is blue.".to_string(),
                options: vec![],
                accepted_answers: vec![],
            },
        ]
    }

    /// A valid answer for any `mixed_questions` question id.
    pub(crate) fn answer_for(question_id: &str) -> Answer {
        if question_id.starts_with("fill") {
            Answer::Text("oxygen".to_string())
        } else if question_id.starts_with("essay") {
            Answer::Text("Rayleigh scattering favors shorter wavelengths.".to_string())
        } else {
            Answer::Selected(vec![format!("{question_id}-a")])
        }
    }

    /// A bare in-progress session, for tests that exercise components below
    /// the session manager.
    pub(crate) fn session(id: &str, assignment_id: &str, student_id: &str) -> ExamSession {
        let now = primitive_now_utc();
        ExamSession {
            id: id.to_string(),
            assignment_id: assignment_id.to_string(),
            student_id: student_id.to_string(),
            attempt_number: 1,
            status: SessionStatus::InProgress,
            started_at: now,
            expected_end_at: now + Duration::minutes(30),
            time_remaining_seconds: 30 * 60,
            total_grace_seconds: 0,
            shuffle_seed: 1,
            question_order: vec![],
            option_orders: HashMap::new(),
            answers: HashMap::new(),
            current_question_index: 0,
            disconnect_count: 0,
            flagged_for_review: false,
            anticheat: AntiCheatConfig::advanced(),
            fallback: fallback(),
            updated_at: now,
        }
    }
}
