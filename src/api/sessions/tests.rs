use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::domain::types::UserRole;
use crate::test_support;

const STUDENT: Option<(&str, UserRole)> = Some(("student-1", UserRole::Student));

async fn start_session(ctx: &test_support::TestContext) -> serde_json::Value {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions",
            STUDENT,
            Some(json!({ "assignment_id": "quiz-1" })),
        ))
        .await
        .expect("start session");
    assert_eq!(response.status(), StatusCode::CREATED);
    test_support::read_json(response).await
}

#[tokio::test]
async fn start_returns_shuffled_questions_without_answers() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;

    assert_eq!(session["status"], "in_progress");
    assert_eq!(session["attempt_number"], 1);
    assert_eq!(session["time_remaining_seconds"], 30 * 60);

    let questions = session["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 5);
    for question in questions {
        assert!(question["prompt"].is_string());
        for option in question["options"].as_array().expect("options") {
            assert!(option.get("correct").is_none(), "correctness leaked: {option}");
        }
        assert!(question.get("accepted_answers").is_none());
    }
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions",
            None,
            Some(json!({ "assignment_id": "quiz-1" })),
        ))
        .await
        .expect("start session");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_assignment_is_not_found() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/sessions",
            STUDENT,
            Some(json!({ "assignment_id": "nope" })),
        ))
        .await
        .expect("start session");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn another_student_cannot_touch_the_session() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/sessions/{session_id}/answers/single-1"),
            Some(("student-2", UserRole::Student)),
            Some(json!({ "answer": { "type": "selected", "value": ["single-1-a"] } })),
        ))
        .await
        .expect("answer");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn answer_save_submit_flow_returns_a_grade() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    for question in session["questions"].as_array().expect("questions") {
        let question_id = question["id"].as_str().expect("question id");
        let answer = match test_support::fixtures::answer_for(question_id) {
            crate::domain::models::Answer::Selected(ids) => {
                json!({ "type": "selected", "value": ids })
            }
            crate::domain::models::Answer::Text(text) => json!({ "type": "text", "value": text }),
        };
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/sessions/{session_id}/answers/{question_id}"),
                STUDENT,
                Some(json!({ "answer": answer })),
            ))
            .await
            .expect("answer");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/save"),
            STUDENT,
            None,
        ))
        .await
        .expect("save");
    assert_eq!(response.status(), StatusCode::OK);
    let checkpoint = test_support::read_json(response).await;
    assert_eq!(checkpoint["answered_count"], 5);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/submit"),
            STUDENT,
            None,
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::OK);
    let submission = test_support::read_json(response).await;

    assert_eq!(submission["reason"], "manual_submit");
    assert!(submission["content_hash"].as_str().map(|h| !h.is_empty()).unwrap_or(false));
    let grade = &submission["grade"];
    assert_eq!(grade["requires_manual"], true);
    assert!(grade["grade"].as_f64().expect("grade") > 0.0);
    assert_eq!(grade["breakdown"].as_array().expect("breakdown").len(), 5);

    let persisted = ctx.state.sessions().submission_for(&session_id).await.expect("persisted");
    assert_eq!(Some(persisted.id.as_str()), submission["id"].as_str());
}

#[tokio::test]
async fn repeat_submit_returns_the_same_submission() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    let submit = |uri: String| {
        ctx.app.clone().oneshot(test_support::json_request(Method::POST, &uri, STUDENT, None))
    };
    let first = submit(format!("/api/v1/sessions/{session_id}/submit")).await.expect("submit");
    let first = test_support::read_json(first).await;
    let second = submit(format!("/api/v1/sessions/{session_id}/submit")).await.expect("resubmit");
    let second = test_support::read_json(second).await;

    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn answer_after_submit_conflicts() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    ctx.app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/submit"),
            STUDENT,
            None,
        ))
        .await
        .expect("submit");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/sessions/{session_id}/answers/single-1"),
            STUDENT,
            Some(json!({ "answer": { "type": "selected", "value": ["single-1-a"] } })),
        ))
        .await
        .expect("answer");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn disconnect_pauses_and_reconnect_resumes() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/disconnect"),
            STUDENT,
            None,
        ))
        .await
        .expect("disconnect");
    assert_eq!(response.status(), StatusCode::OK);
    let paused = test_support::read_json(response).await;
    assert_eq!(paused["status"], "paused");
    assert_eq!(paused["disconnect_count"], 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/reconnect"),
            STUDENT,
            None,
        ))
        .await
        .expect("reconnect");
    let resumed = test_support::read_json(response).await;
    assert_eq!(resumed["status"], "in_progress");
}

#[tokio::test]
async fn proctor_event_is_recorded_and_listed() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/events"),
            STUDENT,
            Some(json!({ "event_type": "tab_switch_detected", "metadata": { "count": 1 } })),
        ))
        .await
        .expect("event");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["accepted"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/sessions/{session_id}/events"),
            STUDENT,
            None,
        ))
        .await
        .expect("events");
    let events = test_support::read_json(response).await;
    let events = events.as_array().expect("event list");
    assert!(events
        .iter()
        .any(|event| event["event_type"] == "tab_switch_detected"));
    assert!(events.iter().any(|event| event["event_type"] == "session_started"));
}

#[tokio::test]
async fn fullscreen_signal_is_dropped_under_medium_policy() {
    let ctx = test_support::setup_test_context().await;
    let session = start_session(&ctx).await;
    let session_id = session["id"].as_str().expect("session id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/events"),
            STUDENT,
            Some(json!({ "event_type": "fullscreen_exit" })),
        ))
        .await
        .expect("event");
    let body = test_support::read_json(response).await;
    assert_eq!(body["accepted"], false);
}
