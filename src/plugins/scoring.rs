//! Per-skill correct/total counters and the readiness test.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accumulated grading results for one skill.
///
/// `correct <= total` holds for every value built through [`SkillScore::new`],
/// deserialization included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSkillScore")]
pub struct SkillScore {
    pub correct: u32,
    pub total: u32,
}

#[derive(Deserialize)]
struct RawSkillScore {
    #[serde(default)]
    correct: u32,
    #[serde(default)]
    total: u32,
}

impl From<RawSkillScore> for SkillScore {
    fn from(raw: RawSkillScore) -> Self {
        SkillScore::new(raw.correct, raw.total)
    }
}

impl SkillScore {
    pub fn new(correct: u32, total: u32) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }
}

pub type ScoreMap = BTreeMap<String, SkillScore>;

/// Score for `node_id`, zero when it was never graded.
pub fn score_for(scores: &ScoreMap, node_id: &str) -> SkillScore {
    scores.get(node_id).copied().unwrap_or_default()
}

pub fn is_ready(scores: &ScoreMap, node_id: &str, threshold: u32) -> bool {
    score_for(scores, node_id).correct >= threshold
}

/// Record one graded answer for `node_id`.
///
/// `total` becomes `max(total, total_for_node)` and never shrinks. `correct` is
/// incremented on a correct answer but capped at the new `total`, so regrading a
/// question cannot push it past the number of known items.
pub fn update_score(
    scores: &mut ScoreMap,
    node_id: &str,
    was_correct: bool,
    total_for_node: u32,
) -> SkillScore {
    let entry = scores.entry(node_id.to_string()).or_default();
    let total = entry.total.max(total_for_node);
    let correct = if was_correct {
        entry.correct.saturating_add(1)
    } else {
        entry.correct
    };
    *entry = SkillScore::new(correct, total);
    *entry
}
