use std::collections::{HashMap, HashSet};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::domain::models::{Answer, GradeResult, Question, QuestionScore};
use crate::domain::types::QuestionKind;

/// False selections on MULTIPLE questions cost half a correct option each.
const WRONG_SELECTION_PENALTY: f64 = 0.5;

/// Scores a completed answer set against the snapshot ground truth. Pure and
/// idempotent: recomputing from the same answers yields the same result. A
/// malformed answer shape degrades to zero credit for that question instead
/// of aborting the computation.
pub(crate) fn grade(questions: &[Question], answers: &HashMap<String, Answer>) -> GradeResult {
    let mut breakdown = Vec::with_capacity(questions.len());
    let mut requires_manual = false;

    for question in questions {
        let score = score_question(question, answers.get(&question.id));
        if question.kind == QuestionKind::Essay {
            requires_manual = true;
        }
        if score.fallback {
            tracing::warn!(
                question_id = %question.id,
                "Answer shape did not match question type; scored as zero credit"
            );
        }
        breakdown.push(score);
    }

    let total_questions = questions.len();
    let earned: f64 = breakdown.iter().map(|entry| entry.score.unwrap_or(0.0)).sum();
    let grade = if total_questions == 0 {
        0.0
    } else {
        round_one_decimal(earned / total_questions as f64 * 10.0)
    };

    let fully_correct = breakdown
        .iter()
        .filter(|entry| entry.score.map(|value| value >= 1.0).unwrap_or(false))
        .count();

    let feedback = if requires_manual {
        format!(
            "Auto-graded {fully_correct} of {total_questions} questions fully correct \
             ({grade:.1}/10 provisional); essay answers await manual grading"
        )
    } else {
        format!("Scored {grade:.1}/10 ({fully_correct} of {total_questions} questions fully correct)")
    };

    GradeResult { grade, feedback, breakdown, requires_manual }
}

fn score_question(question: &Question, answer: Option<&Answer>) -> QuestionScore {
    let entry = |score: Option<f64>, fallback: bool| QuestionScore {
        question_id: question.id.clone(),
        score,
        fallback,
    };

    if question.kind == QuestionKind::Essay {
        return entry(None, false);
    }

    let Some(answer) = answer else {
        return entry(Some(0.0), false);
    };

    match (question.kind, answer) {
        (QuestionKind::Single | QuestionKind::TrueFalse, Answer::Selected(selected)) => {
            let correct: HashSet<&str> = question
                .options
                .iter()
                .filter(|option| option.correct)
                .map(|option| option.id.as_str())
                .collect();
            let picked: HashSet<&str> = selected.iter().map(|id| id.as_str()).collect();
            let score = if !correct.is_empty() && picked == correct { 1.0 } else { 0.0 };
            entry(Some(score), false)
        }
        (QuestionKind::Multiple, Answer::Selected(selected)) => {
            let correct: HashSet<&str> = question
                .options
                .iter()
                .filter(|option| option.correct)
                .map(|option| option.id.as_str())
                .collect();
            let picked: HashSet<&str> = selected.iter().map(|id| id.as_str()).collect();

            let total = correct.len().max(1) as f64;
            let true_positives = picked.intersection(&correct).count() as f64;
            let false_positives = picked.difference(&correct).count() as f64;

            let score = ((true_positives - WRONG_SELECTION_PENALTY * false_positives) / total)
                .clamp(0.0, 1.0);
            entry(Some(score), false)
        }
        (QuestionKind::FillBlank, Answer::Text(text)) => {
            let submitted = normalize_text(text);
            let matched = question
                .accepted_answers
                .iter()
                .any(|accepted| normalize_text(accepted) == submitted);
            entry(Some(if matched { 1.0 } else { 0.0 }), false)
        }
        // Shape mismatch: conservative zero credit rather than aborting.
        _ => entry(Some(0.0), true),
    }
}

/// Normalization used for fill-blank matching: NFD decompose, strip
/// combining marks, trim, case-fold. Authoring-side de-duplication of
/// accepted answers uses the same comparison.
pub(crate) fn normalize_text(input: &str) -> String {
    input
        .trim()
        .nfd()
        .filter(|character| !is_combining_mark(*character))
        .collect::<String>()
        .to_lowercase()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
