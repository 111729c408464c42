use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::domain::types::UserRole;
use crate::test_support;

const STUDENT: Option<(&str, UserRole)> = Some(("student-1", UserRole::Student));
const TEACHER: Option<(&str, UserRole)> = Some(("teacher-1", UserRole::Teacher));

async fn start_session(ctx: &test_support::TestContext) -> String {
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
    let body = test_support::read_json(response).await;
    body["id"].as_str().expect("session id").to_string()
}

#[tokio::test]
async fn students_cannot_reach_oversight() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/oversight/sessions",
            STUDENT,
            None,
        ))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/extend-time"),
            STUDENT,
            Some(json!({ "minutes": 10, "justification": "please" })),
        ))
        .await
        .expect("extend");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn monitoring_lists_progress_rows() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    ctx.app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/sessions/{session_id}/answers/single-1"),
            STUDENT,
            Some(json!({ "answer": { "type": "selected", "value": ["single-1-a"] } })),
        ))
        .await
        .expect("answer");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/oversight/sessions?assignment_id=quiz-1",
            TEACHER,
            None,
        ))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);

    let rows = test_support::read_json(response).await;
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], session_id.as_str());
    assert_eq!(rows[0]["answered_count"], 1);
    assert_eq!(rows[0]["total_questions"], 5);
    assert_eq!(rows[0]["progress_percent"], 20.0);
}

#[tokio::test]
async fn extend_time_requires_a_justification() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/extend-time"),
            TEACHER,
            Some(json!({ "minutes": 10, "justification": "" })),
        ))
        .await
        .expect("extend");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extend_time_adds_to_the_countdown() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/extend-time"),
            TEACHER,
            Some(json!({ "minutes": 10, "justification": "projector failed" })),
        ))
        .await
        .expect("extend");
    assert_eq!(response.status(), StatusCode::OK);

    let row = test_support::read_json(response).await;
    assert_eq!(row["time_remaining_seconds"], 40 * 60);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/oversight/sessions/{session_id}/events"),
            TEACHER,
            None,
        ))
        .await
        .expect("events");
    let events = test_support::read_json(response).await;
    assert!(events
        .as_array()
        .expect("events")
        .iter()
        .any(|event| event["event_type"] == "time_extended"));
}

#[tokio::test]
async fn grace_approval_resumes_a_paused_session() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    ctx.app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/disconnect"),
            STUDENT,
            None,
        ))
        .await
        .expect("disconnect");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/grace"),
            TEACHER,
            Some(json!({ "seconds": 120, "justification": "campus network outage" })),
        ))
        .await
        .expect("grace");
    assert_eq!(response.status(), StatusCode::OK);

    let row = test_support::read_json(response).await;
    assert_eq!(row["status"], "in_progress");
    assert_eq!(row["time_remaining_seconds"], 30 * 60 + 120);
}

#[tokio::test]
async fn reset_wipes_answers_and_restores_the_clock() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    ctx.app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/sessions/{session_id}/answers/single-1"),
            STUDENT,
            Some(json!({ "answer": { "type": "selected", "value": ["single-1-a"] } })),
        ))
        .await
        .expect("answer");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/reset"),
            TEACHER,
            Some(json!({ "justification": "fire alarm during the attempt" })),
        ))
        .await
        .expect("reset");
    assert_eq!(response.status(), StatusCode::OK);

    let row = test_support::read_json(response).await;
    assert_eq!(row["answered_count"], 0);
    assert_eq!(row["time_remaining_seconds"], 30 * 60);
    assert_eq!(row["status"], "in_progress");
}

#[tokio::test]
async fn terminate_finalizes_and_blocks_further_answers() {
    let ctx = test_support::setup_test_context().await;
    let session_id = start_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/terminate"),
            TEACHER,
            Some(json!({ "justification": "phone out during the exam" })),
        ))
        .await
        .expect("terminate");
    assert_eq!(response.status(), StatusCode::OK);
    let submission = test_support::read_json(response).await;
    assert_eq!(submission["reason"], "teacher_terminated");

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

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/oversight/sessions/{session_id}/terminate"),
            TEACHER,
            Some(json!({ "justification": "again" })),
        ))
        .await
        .expect("terminate again");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
