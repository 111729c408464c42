use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::domain::models::{AntiCheatConfig, Assignment};

#[derive(Debug, Clone)]
pub(crate) struct ShuffledOrder {
    pub(crate) question_order: Vec<String>,
    pub(crate) option_orders: HashMap<String, Vec<String>>,
}

pub(crate) fn new_seed() -> u64 {
    rand::random()
}

/// Derives the per-student ordering for a session. Deterministic for a given
/// seed; identity order on either axis when shuffling is disabled. Each
/// question gets its own sub-seed so option order does not depend on question
/// iteration order.
pub(crate) fn shuffle_assignment(
    assignment: &Assignment,
    config: &AntiCheatConfig,
    seed: u64,
) -> ShuffledOrder {
    let mut question_order: Vec<String> =
        assignment.questions.iter().map(|question| question.id.clone()).collect();

    if config.shuffle_questions {
        let mut rng = StdRng::seed_from_u64(seed);
        question_order.shuffle(&mut rng);
    }

    let mut option_orders = HashMap::with_capacity(assignment.questions.len());
    for question in &assignment.questions {
        let mut option_ids: Vec<String> =
            question.options.iter().map(|option| option.id.clone()).collect();

        if config.shuffle_options && option_ids.len() > 1 {
            let mut rng = StdRng::seed_from_u64(option_seed(seed, &question.id));
            option_ids.shuffle(&mut rng);
        }

        option_orders.insert(question.id.clone(), option_ids);
    }

    ShuffledOrder { question_order, option_orders }
}

fn option_seed(seed: u64, question_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_be_bytes());
    hasher.update(question_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
