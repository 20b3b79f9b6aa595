//! Content explanations for `ANSWER_CONTENT` turns.
//!
//! A model-backed explainer can be plugged in behind [`ContentExplainer`]; the
//! crate ships only the deterministic [`FallbackExplainer`], which never touches
//! the network.

use crate::core::error::TutorError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub content_markdown: String,
    pub rationale: String,
}

pub trait ContentExplainer: Send + Sync {
    fn explain(&self, topic_title: &str, skipped_diagnostic: bool)
    -> Result<Explanation, TutorError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackExplainer;

impl ContentExplainer for FallbackExplainer {
    fn explain(
        &self,
        topic_title: &str,
        skipped_diagnostic: bool,
    ) -> Result<Explanation, TutorError> {
        let content_markdown = format!(
            "## {topic_title}\n\n\
             A short primer on **{topic_title}**: start from a small concrete example, \
             name the operation being counted, then check how that count grows as the \
             input grows. Ask for a question on {topic_title} whenever you want to test it."
        );
        let rationale = if skipped_diagnostic {
            format!(
                "You skipped the diagnostic, so this is a general primer on {topic_title}."
            )
        } else {
            format!("You asked for an explanation of {topic_title}.")
        };
        Ok(Explanation {
            content_markdown,
            rationale,
        })
    }
}
