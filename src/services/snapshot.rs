use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::domain::models::{Assignment, ContentSnapshot};

/// Freezes the assignment content as presented to the student. The hash keys
/// the snapshot so later question-bank edits cannot retroactively change what
/// a historical submission was graded against.
pub(crate) fn build_snapshot(assignment: &Assignment) -> Result<ContentSnapshot> {
    let questions = assignment.questions.clone();
    let canonical =
        serde_json::to_vec(&questions).context("Failed to serialize content snapshot")?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let content_hash = hex::encode(hasher.finalize());

    Ok(ContentSnapshot { content_hash, questions })
}
