use anyhow::Context;
use time::Duration;

use crate::core::config::Environment;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::domain::models::{AntiCheatConfig, Assignment, Question, QuestionOption};
use crate::domain::types::QuestionKind;

/// Loads the assignments this process will serve. An `ASSIGNMENTS_FILE` (JSON
/// array of assignments) wins; without one, non-production environments get a
/// built-in sample so the service is usable out of the box.
pub(crate) async fn ensure_assignments(state: &AppState) -> anyhow::Result<()> {
    if let Some(path) = &state.settings().runtime().assignments_file {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read assignments file {path}"))?;
        let assignments: Vec<Assignment> = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse assignments file {path}"))?;
        let count = assignments.len();
        for assignment in assignments {
            state.assignments().insert(assignment).await;
        }
        tracing::info!(count, path = %path, "Assignments loaded");
        return Ok(());
    }

    if state.settings().runtime().environment == Environment::Production {
        tracing::warn!("ASSIGNMENTS_FILE not configured; serving no assignments");
        return Ok(());
    }

    let sample = sample_assignment();
    let id = sample.id.clone();
    state.assignments().insert(sample).await;
    tracing::info!(assignment_id = %id, "Seeded sample assignment");
    Ok(())
}

fn sample_assignment() -> Assignment {
    let now = primitive_now_utc();
    Assignment {
        id: "sample-quiz".to_string(),
        title: "Sample quiz".to_string(),
        time_limit_minutes: 15,
        max_attempts: 3,
        open_at: now - Duration::hours(1),
        lock_at: now + Duration::days(30),
        auto_grade: true,
        questions: vec![
            Question {
                id: "sample-q1".to_string(),
                kind: QuestionKind::Single,
                prompt: "What is the chemical symbol for water?".to_string(),
                options: vec![
                    QuestionOption {
                        id: "sample-q1-a".to_string(),
                        label: "H2O".to_string(),
                        correct: true,
                    },
                    QuestionOption {
                        id: "sample-q1-b".to_string(),
                        label: "CO2".to_string(),
                        correct: false,
                    },
                    QuestionOption {
                        id: "sample-q1-c".to_string(),
                        label: "NaCl".to_string(),
                        correct: false,
                    },
                ],
                accepted_answers: vec![],
            },
            Question {
                id: "sample-q2".to_string(),
                kind: QuestionKind::FillBlank,
                prompt: "The capital of France is ____.".to_string(),
                options: vec![],
                accepted_answers: vec!["Paris".to_string()],
            },
        ],
        anticheat: AntiCheatConfig::basic(),
        fallback: None,
    }
}
