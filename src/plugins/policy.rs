//! Tutoring policy: picks the single next pedagogical action.
//!
//! [`decide_next`] is a pure function of the learner snapshot, the prerequisite
//! view and the policy constants. Rules are evaluated in a fixed priority order and
//! the first match wins:
//!
//! 1. content request → `ANSWER_CONTENT`
//! 2. session start → `OFFER_DIAGNOSTIC`
//! 3. unmet prerequisite → `REVIEW_PREREQ` on the first unmet one, in declared order
//! 4. questions left for the focus skill → `ASK_QUESTION`
//! 5. focus skill ready → `ADVANCE`
//! 6. focus skill has prerequisites → `REVIEW_PREREQ` on the first one
//! 7. otherwise → `ASK_QUESTION`
//!
//! Confidence is a coarse tier derived from how many independent signals backed
//! the branch, not from score magnitudes.

use crate::plugins::scoring::{ScoreMap, SkillScore, is_ready, score_for};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::BuildHasher;

pub const DEFAULT_READY_THRESHOLD: u32 = 2;
pub const DEFAULT_ITEMS_PER_NODE: u32 = 3;

/// Read-only prerequisite lookup used by the policy.
pub trait PrerequisiteSource {
    /// Declared prerequisites of `id`, in review order. Unknown ids have none.
    fn prerequisites_of(&self, id: &str) -> &[String];
}

impl<S: BuildHasher> PrerequisiteSource for HashMap<String, Vec<String>, S> {
    fn prerequisites_of(&self, id: &str) -> &[String] {
        self.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Start,
    Continue,
    ContentOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Invite the learner to a short diagnostic.
    OfferDiagnostic,
    /// Present the next practice/diagnostic item.
    AskQuestion,
    /// Route to a prerequisite skill.
    ReviewPrereq,
    /// The focus skill is mastered.
    Advance,
    /// Answer a free-form content request.
    AnswerContent,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::OfferDiagnostic,
        Action::AskQuestion,
        Action::ReviewPrereq,
        Action::Advance,
        Action::AnswerContent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::OfferDiagnostic => "OFFER_DIAGNOSTIC",
            Action::AskQuestion => "ASK_QUESTION",
            Action::ReviewPrereq => "REVIEW_PREREQ",
            Action::Advance => "ADVANCE",
            Action::AnswerContent => "ANSWER_CONTENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

pub fn confidence_from_signals(signals: u8) -> Confidence {
    match signals {
        0 | 1 => Confidence::Low,
        2 => Confidence::Medium,
        _ => Confidence::High,
    }
}

/// Signals behind a decision, one shape per branch. Rendering reads them; the
/// policy never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    ContentRequest {
        skipped_diagnostic: bool,
        topic_node: String,
    },
    Diagnostic {
        reason: String,
        items_planned: u32,
    },
    UnmetPrerequisites {
        unmet_prerequisites: Vec<String>,
        review_node: String,
        score_correct: u32,
        score_total: u32,
        threshold: u32,
    },
    PendingItems {
        skill: String,
        remaining: usize,
    },
    Ready {
        from_node: String,
        score_correct: u32,
        score_total: u32,
        threshold: u32,
    },
    FallbackPrerequisite {
        fallback_prerequisite: String,
        from_node: String,
        score_correct: u32,
        score_total: u32,
        threshold: u32,
    },
    InsufficientEvidence {
        skill: String,
        reason: String,
    },
}

impl Evidence {
    /// Flat key/value view for template rendering.
    pub fn to_context(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    pub threshold: u32,
    /// Only reported in evidence; it does not change which rule fires.
    pub items_per_node: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_READY_THRESHOLD,
            items_per_node: DEFAULT_ITEMS_PER_NODE,
        }
    }
}

/// Snapshot of everything about the learner the policy looks at.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    pub intent: Intent,
    pub current_node: &'a str,
    pub scores: &'a ScoreMap,
    /// Undelivered questions left for `current_node`.
    pub pending_items_in_node: usize,
    pub skipped_diagnostic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub next_node: Option<String>,
    pub from_node: Option<String>,
    pub evidence: Evidence,
    pub confidence: Confidence,
}

fn reported_total(score: SkillScore, config: &PolicyConfig) -> u32 {
    if score.total == 0 {
        config.items_per_node
    } else {
        score.total
    }
}

pub fn decide_next<P>(input: &PolicyInput<'_>, prerequisites: &P, config: &PolicyConfig) -> Decision
where
    P: PrerequisiteSource + ?Sized,
{
    let current = input.current_node;

    if input.intent == Intent::ContentOnly {
        return Decision {
            action: Action::AnswerContent,
            next_node: Some(current.to_string()),
            from_node: None,
            evidence: Evidence::ContentRequest {
                skipped_diagnostic: input.skipped_diagnostic,
                topic_node: current.to_string(),
            },
            confidence: Confidence::Medium,
        };
    }

    if input.intent == Intent::Start {
        return Decision {
            action: Action::OfferDiagnostic,
            next_node: Some(current.to_string()),
            from_node: None,
            evidence: Evidence::Diagnostic {
                reason: "personalize_path".to_string(),
                items_planned: config.items_per_node,
            },
            confidence: Confidence::Medium,
        };
    }

    let prereqs = prerequisites.prerequisites_of(current);
    let unmet: Vec<String> = prereqs
        .iter()
        .filter(|p| !is_ready(input.scores, p, config.threshold))
        .cloned()
        .collect();

    if let Some(review_node) = unmet.first().cloned() {
        let score = score_for(input.scores, &review_node);
        return Decision {
            action: Action::ReviewPrereq,
            next_node: Some(review_node.clone()),
            from_node: Some(current.to_string()),
            evidence: Evidence::UnmetPrerequisites {
                unmet_prerequisites: unmet,
                review_node,
                score_correct: score.correct,
                score_total: reported_total(score, config),
                threshold: config.threshold,
            },
            // unmet prerequisite + score evidence
            confidence: confidence_from_signals(2),
        };
    }

    if input.pending_items_in_node > 0 {
        return Decision {
            action: Action::AskQuestion,
            next_node: Some(current.to_string()),
            from_node: None,
            evidence: Evidence::PendingItems {
                skill: current.to_string(),
                remaining: input.pending_items_in_node,
            },
            confidence: Confidence::High,
        };
    }

    if is_ready(input.scores, current, config.threshold) {
        let score = score_for(input.scores, current);
        return Decision {
            action: Action::Advance,
            next_node: Some(current.to_string()),
            from_node: None,
            evidence: Evidence::Ready {
                from_node: current.to_string(),
                score_correct: score.correct,
                score_total: reported_total(score, config),
                threshold: config.threshold,
            },
            // node score + prerequisites satisfied + nothing pending
            confidence: confidence_from_signals(3),
        };
    }

    if let Some(fallback) = prereqs.first() {
        let score = score_for(input.scores, fallback);
        return Decision {
            action: Action::ReviewPrereq,
            next_node: Some(fallback.clone()),
            from_node: Some(current.to_string()),
            evidence: Evidence::FallbackPrerequisite {
                fallback_prerequisite: fallback.clone(),
                from_node: current.to_string(),
                score_correct: score.correct,
                score_total: reported_total(score, config),
                threshold: config.threshold,
            },
            confidence: Confidence::Low,
        };
    }

    Decision {
        action: Action::AskQuestion,
        next_node: Some(current.to_string()),
        from_node: None,
        evidence: Evidence::InsufficientEvidence {
            skill: current.to_string(),
            reason: "insufficient_evidence".to_string(),
        },
        confidence: Confidence::Low,
    }
}
