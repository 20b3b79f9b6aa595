//! Question bank: per-skill ordered questions with expected answers.

use crate::core::assets;
use crate::core::error::TutorError;
use crate::plugins::graph::SkillGraph;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const QUESTIONS_FILE: &str = "questions.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub skill: String,
    pub prompt: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

/// What the learner is shown: everything except the expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub skill: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl Question {
    /// Whitespace-trimmed, case-sensitive comparison.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim() == self.answer.trim()
    }

    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            skill: self.skill.clone(),
            prompt: self.prompt.clone(),
            choices: self.choices.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionsFile {
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    by_skill: FxHashMap<String, Vec<Question>>,
    /// question id -> (skill, position within that skill)
    index: FxHashMap<String, (String, usize)>,
}

impl QuestionBank {
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, TutorError> {
        let mut bank = Self::default();
        for q in questions {
            if bank.index.contains_key(&q.id) {
                return Err(TutorError::ValidationError(format!(
                    "duplicate question id '{}'",
                    q.id
                )));
            }
            let items = bank.by_skill.entry(q.skill.clone()).or_default();
            bank.index.insert(q.id.clone(), (q.skill.clone(), items.len()));
            items.push(q);
        }
        Ok(bank)
    }

    pub fn from_toml(raw: &str) -> Result<Self, TutorError> {
        let file: QuestionsFile = toml::from_str(raw)?;
        Self::from_questions(file.questions)
    }

    pub fn builtin() -> Result<Self, TutorError> {
        Self::from_toml(assets::EMBEDDED_QUESTIONS)
    }

    pub fn load(data_dir: Option<&Path>) -> Result<Self, TutorError> {
        Self::from_toml(&assets::load_data(data_dir, QUESTIONS_FILE)?)
    }

    /// Reject questions attached to skills the graph does not know.
    pub fn validate_against(&self, graph: &SkillGraph) -> Result<(), TutorError> {
        let mut skills: Vec<&String> = self.by_skill.keys().collect();
        skills.sort();
        for skill in skills {
            if !graph.contains(skill) {
                return Err(TutorError::ValidationError(format!(
                    "questions reference unknown skill '{}'",
                    skill
                )));
            }
        }
        Ok(())
    }

    pub fn for_skill(&self, skill: &str) -> &[Question] {
        self.by_skill
            .get(skill)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn count_for(&self, skill: &str) -> usize {
        self.for_skill(skill).len()
    }

    pub fn at(&self, skill: &str, index: usize) -> Option<&Question> {
        self.for_skill(skill).get(index)
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        let (skill, pos) = self.index.get(id)?;
        self.at(skill, *pos)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
