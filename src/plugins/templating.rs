//! Rationale templates and turn presentation.
//!
//! Templates are plain strings with `{{ name }}` placeholders, loaded from the
//! `[templates]` table of `explanations.toml`. [`present`] turns a decided
//! [`Turn`] into the text and controls shown to the learner.

use crate::core::assets;
use crate::core::error::TutorError;
use crate::plugins::explain::{ContentExplainer, Explanation};
use crate::plugins::orchestrator::Turn;
use crate::plugins::policy::{Action, DEFAULT_READY_THRESHOLD, Evidence};
use crate::plugins::questions::QuestionView;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

pub const EXPLANATIONS_FILE: &str = "explanations.toml";

pub const DIAGNOSTIC_OPTIONS: [&str; 2] = ["Diagnostic: Yes", "Diagnostic: No"];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("static regex")
});

#[derive(Debug, Deserialize)]
struct ExplanationsFile {
    #[serde(default)]
    templates: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, String>,
}

impl TemplateSet {
    pub fn from_toml(raw: &str) -> Result<Self, TutorError> {
        let file: ExplanationsFile = toml::from_str(raw)?;
        Ok(Self {
            templates: file.templates,
        })
    }

    pub fn builtin() -> Result<Self, TutorError> {
        Self::from_toml(assets::EMBEDDED_EXPLANATIONS)
    }

    pub fn load(data_dir: Option<&Path>) -> Result<Self, TutorError> {
        Self::from_toml(&assets::load_data(data_dir, EXPLANATIONS_FILE)?)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn render(&self, key: &str, ctx: &Map<String, Value>) -> Result<String, TutorError> {
        self.render_optional(key, ctx)?
            .ok_or_else(|| TutorError::TemplateNotFound(key.to_string()))
    }

    /// Like [`TemplateSet::render`], but an absent template is `None`.
    pub fn render_optional(
        &self,
        key: &str,
        ctx: &Map<String, Value>,
    ) -> Result<Option<String>, TutorError> {
        Ok(self.templates.get(key).map(|tpl| fill(tpl, ctx)))
    }
}

fn fill(template: &str, ctx: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            ctx.get(&caps[1]).map(display_value).unwrap_or_default()
        })
        .into_owned()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// What the learner sees for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ui {
    pub rationale: String,
    pub question: Option<QuestionView>,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Explanation>,
}

/// Evidence plus resolved titles, the context every rationale template sees.
pub fn turn_context(turn: &Turn) -> Map<String, Value> {
    let mut ctx = turn.evidence.to_context();
    let next_title = turn.titles.next_title.clone().unwrap_or_default();
    let from_title = turn.titles.from_title.clone().unwrap_or_default();
    ctx.insert("skill_title".into(), Value::from(next_title.clone()));
    ctx.insert("next_title".into(), Value::from(next_title));
    ctx.insert("from_title".into(), Value::from(from_title));
    ctx.entry("threshold")
        .or_insert_with(|| Value::from(DEFAULT_READY_THRESHOLD));
    ctx.insert("confidence".into(), Value::from(turn.confidence.as_str()));
    ctx
}

pub fn present(
    turn: &Turn,
    templates: &TemplateSet,
    explainer: &dyn ContentExplainer,
) -> Result<Ui, TutorError> {
    let ctx = turn_context(turn);
    let mut ui = Ui {
        rationale: String::new(),
        question: None,
        options: Vec::new(),
        content: None,
    };

    match turn.action {
        Action::OfferDiagnostic => {
            ui.rationale = templates.render("offer_diagnostic", &ctx)?;
            ui.options = DIAGNOSTIC_OPTIONS.iter().map(|s| s.to_string()).collect();
        }
        Action::AskQuestion => {
            let mut intro = Map::new();
            intro.insert(
                "skill_title".into(),
                ctx.get("skill_title").cloned().unwrap_or_default(),
            );
            ui.rationale = match &turn.question {
                Some(_) => templates.render("ask_question_intro", &intro)?,
                None => match templates.render_optional("no_more_questions", &intro)? {
                    Some(text) => text,
                    None => templates.render("ask_question_intro", &intro)?,
                },
            };
            ui.question = turn.question.clone();
        }
        Action::ReviewPrereq => {
            let base = templates.render("review_prereq", &ctx)?;
            ui.rationale = match templates.render_optional("review_prereq_counterfactual", &ctx)? {
                Some(cf) => format!("{base} {cf}"),
                None => base,
            };
        }
        Action::Advance => {
            ui.rationale = templates.render("advance", &ctx)?;
        }
        Action::AnswerContent => {
            let topic = turn
                .titles
                .next_title
                .clone()
                .unwrap_or_else(|| "this topic".to_string());
            let skipped = matches!(
                turn.evidence,
                Evidence::ContentRequest {
                    skipped_diagnostic: true,
                    ..
                }
            );
            let mut note = Map::new();
            note.insert("topic".into(), Value::from(topic.clone()));
            ui.rationale = templates.render("answer_content_note", &note)?;
            ui.content = Some(explainer.explain(&topic, skipped)?);
        }
    }
    Ok(ui)
}
