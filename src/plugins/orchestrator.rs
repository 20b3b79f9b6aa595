//! Session orchestration: one read → decide → mutate → persist cycle per event.
//!
//! [`Tutor`] owns the read-only curriculum (graph, question bank, templates) and a
//! [`StateStore`]. Every operation on a session runs under that session's lock, so
//! two requests for the same learner never interleave their read-modify-write.

use crate::core::audit::{AuditKind, AuditLog};
use crate::core::config::TutorConfig;
use crate::core::error::TutorError;
use crate::core::session_lock::SessionLocks;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::explain::{ContentExplainer, FallbackExplainer};
use crate::plugins::graph::SkillGraph;
use crate::plugins::policy::{
    Action, Confidence, Decision, Evidence, Intent, PolicyConfig, PolicyInput, decide_next,
};
use crate::plugins::questions::{Question, QuestionBank, QuestionView};
use crate::plugins::scoring::{ScoreMap, is_ready};
use crate::plugins::state::{LearnerState, StateStore, open_state_store};
use crate::plugins::templating::{TemplateSet, Ui, present};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Free-form action hint sent by the client alongside a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionHint {
    Start,
    ContentOnly,
    Answer,
    DiagnosticYes,
    DiagnosticNo,
    Other,
}

impl ActionHint {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("start") => ActionHint::Start,
            Some("content_only") => ActionHint::ContentOnly,
            Some("answer") => ActionHint::Answer,
            Some("diagnostic_yes") => ActionHint::DiagnosticYes,
            Some("diagnostic_no") => ActionHint::DiagnosticNo,
            _ => ActionHint::Other,
        }
    }
}

/// `start` starts and `content_only` asks for content. `diagnostic_no` is the one
/// override: declining the diagnostic routes straight to content instead of
/// continuing. Every other hint, including none, continues the session.
pub fn derive_intent(hint: ActionHint) -> Intent {
    match hint {
        ActionHint::ContentOnly | ActionHint::DiagnosticNo => Intent::ContentOnly,
        ActionHint::Start => Intent::Start,
        ActionHint::Answer | ActionHint::DiagnosticYes | ActionHint::Other => Intent::Continue,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTitles {
    pub next_title: Option<String>,
    pub from_title: Option<String>,
}

/// Outcome of [`Tutor::decide_and_advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: String,
    pub intent: Intent,
    pub action: Action,
    pub next_node: Option<String>,
    pub from_node: Option<String>,
    pub confidence: Confidence,
    pub evidence: Evidence,
    pub titles: ResolvedTitles,
    /// Question consumed by an `ASK_QUESTION` turn; `None` once the skill is exhausted.
    pub question: Option<QuestionView>,
    /// On `ADVANCE`, dependents whose prerequisites are now all ready.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlocked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub correct: bool,
    pub skill: String,
    pub expected: String,
}

/// The `graded` slot of an ingest response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeReport {
    Graded(GradeOutcome),
    Failed { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestEvent {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
    /// "start" | "content_only" | "answer" | "diagnostic_yes" | "diagnostic_no"
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedTurn {
    #[serde(flatten)]
    pub turn: Turn,
    pub ui: Ui,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub server_time: String,
    pub graded: Option<GradeReport>,
    pub result: RenderedTurn,
}

pub struct Tutor {
    graph: Arc<SkillGraph>,
    bank: Arc<QuestionBank>,
    templates: Arc<TemplateSet>,
    explainer: Box<dyn ContentExplainer>,
    store: Box<dyn StateStore>,
    policy: PolicyConfig,
    root_skill: String,
    locks: SessionLocks,
    audit: AuditLog,
}

impl Tutor {
    /// Wire a tutor from already-loaded parts. The root skill must exist in the
    /// graph and every question must belong to a known skill.
    pub fn new(
        graph: Arc<SkillGraph>,
        bank: Arc<QuestionBank>,
        store: Box<dyn StateStore>,
        policy: PolicyConfig,
        root_skill: &str,
    ) -> Result<Self, TutorError> {
        if !graph.contains(root_skill) {
            return Err(TutorError::UnknownSkill(root_skill.to_string()));
        }
        bank.validate_against(&graph)?;
        Ok(Self {
            graph,
            bank,
            templates: Arc::new(TemplateSet::builtin()?),
            explainer: Box::new(FallbackExplainer),
            store,
            policy,
            root_skill: root_skill.to_string(),
            locks: SessionLocks::new(),
            audit: AuditLog::disabled(),
        })
    }

    /// Load curriculum data, the state backend and the audit log as configured.
    pub fn from_config(root: &Path, config: &TutorConfig) -> Result<Self, TutorError> {
        config.validate()?;
        let data_dir = config.data_dir(root);
        let data_dir = data_dir.as_deref();
        let graph = Arc::new(SkillGraph::load(data_dir)?);
        let bank = Arc::new(QuestionBank::load(data_dir)?);
        let templates = TemplateSet::load(data_dir)?;
        let store = open_state_store(&Store::new(config.store.backend, root), config)?;
        let policy = PolicyConfig {
            threshold: config.policy.ready_threshold,
            items_per_node: config.policy.items_per_node,
        };
        let audit = match config.audit_path(root) {
            Some(path) => AuditLog::at(path),
            None => AuditLog::disabled(),
        };

        tracing::debug!(
            backend = config.store.backend.as_str(),
            skills = graph.len(),
            questions = bank.len(),
            "tutor configured"
        );
        Ok(Self::new(graph, bank, store, policy, &config.policy.root_skill)?
            .with_templates(templates)
            .with_audit(audit))
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn with_explainer(mut self, explainer: Box<dyn ContentExplainer>) -> Self {
        self.explainer = explainer;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn graph(&self) -> &SkillGraph {
        &self.graph
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub fn root_skill(&self) -> &str {
        &self.root_skill
    }

    fn load_or_default(&self, session_id: &str) -> Result<LearnerState, TutorError> {
        Ok(self
            .store
            .load(session_id)?
            .unwrap_or_else(|| LearnerState::new(session_id, &self.root_skill)))
    }

    fn unlocked_after(&self, node: &str, scores: &ScoreMap) -> Vec<String> {
        self.graph
            .dependents_of(node)
            .into_iter()
            .filter(|dep| {
                dep.prerequisites
                    .iter()
                    .all(|p| is_ready(scores, p, self.policy.threshold))
            })
            .map(|dep| dep.id.clone())
            .collect()
    }

    fn titles(&self, decision: &Decision) -> ResolvedTitles {
        let title = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| self.graph.title_of(id))
                .map(str::to_string)
        };
        ResolvedTitles {
            next_title: title(&decision.next_node),
            from_title: title(&decision.from_node),
        }
    }

    /// Decide the next action for `session_id`, apply its state changes and persist
    /// them once. The audit entry is written before the save, so a failed audit
    /// leaves the stored session as it was.
    pub fn decide_and_advance(
        &self,
        session_id: &str,
        message: Option<&str>,
        hint: Option<&str>,
    ) -> Result<Turn, TutorError> {
        let hint = ActionHint::parse(hint);
        let intent = derive_intent(hint);

        self.locks.with_session(session_id, || {
            let mut state = self.load_or_default(session_id)?;
            match hint {
                ActionHint::DiagnosticNo => state.skipped_diagnostic = true,
                ActionHint::DiagnosticYes => state.skipped_diagnostic = false,
                _ => {}
            }

            let pending = state.pending_items(&state.current_node, &self.bank);
            let decision = decide_next(
                &PolicyInput {
                    intent,
                    current_node: &state.current_node,
                    scores: &state.scores,
                    pending_items_in_node: pending,
                    skipped_diagnostic: state.skipped_diagnostic,
                },
                self.graph.as_ref(),
                &self.policy,
            );
            tracing::debug!(
                session = session_id,
                intent = ?intent,
                node = %state.current_node,
                pending,
                action = decision.action.as_str(),
                "decision computed"
            );

            let mut question = None;
            let mut unlocked = Vec::new();
            match decision.action {
                Action::AskQuestion => {
                    if let Some(node) = &decision.next_node {
                        question = state
                            .take_next_question(node, &self.bank)
                            .map(Question::view);
                        tracing::debug!(
                            session = session_id,
                            skill = %node,
                            cursor = state.cursor(node),
                            delivered = question.is_some(),
                            "question cursor consumed"
                        );
                    }
                }
                Action::ReviewPrereq => {
                    if let Some(node) = &decision.next_node {
                        state.current_node = node.clone();
                    }
                }
                Action::Advance => {
                    unlocked = self.unlocked_after(&state.current_node, &state.scores);
                }
                Action::OfferDiagnostic | Action::AnswerContent => {}
            }

            let titles = self.titles(&decision);
            let turn = Turn {
                session_id: session_id.to_string(),
                intent,
                action: decision.action,
                next_node: decision.next_node,
                from_node: decision.from_node,
                confidence: decision.confidence,
                evidence: decision.evidence,
                titles,
                question,
                unlocked,
            };
            self.audit.record(
                session_id,
                AuditKind::Decision,
                serde_json::json!({
                    "message_len": message.map(str::len).unwrap_or(0),
                    "turn": &turn,
                }),
            )?;
            self.store.save(&state)?;
            tracing::info!(
                session = session_id,
                action = turn.action.as_str(),
                next = turn.next_node.as_deref().unwrap_or("-"),
                confidence = turn.confidence.as_str(),
                "turn persisted"
            );
            Ok(turn)
        })
    }

    /// Grade one answer. An unknown question id fails before any state is read,
    /// so nothing about the session changes. Like a turn, the audit entry precedes
    /// the save.
    pub fn grade_answer(
        &self,
        session_id: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<GradeOutcome, TutorError> {
        let question = self.bank.find(question_id).ok_or_else(|| {
            tracing::warn!(session = session_id, question = question_id, "unknown question");
            TutorError::UnknownQuestion(question_id.to_string())
        })?;

        self.locks.with_session(session_id, || {
            let mut state = self.load_or_default(session_id)?;
            let correct = question.is_correct(answer);
            let total_for_node = u32::try_from(self.bank.count_for(&question.skill))
                .unwrap_or(u32::MAX);
            let score = state.record_grade(&question.skill, correct, total_for_node);

            let outcome = GradeOutcome {
                correct,
                skill: question.skill.clone(),
                expected: question.answer.clone(),
            };
            self.audit.record(
                session_id,
                AuditKind::Graded,
                serde_json::json!({
                    "question_id": question_id,
                    "outcome": &outcome,
                    "score": score,
                }),
            )?;
            self.store.save(&state)?;
            tracing::info!(
                session = session_id,
                question = question_id,
                correct,
                score_correct = score.correct,
                score_total = score.total,
                "answer graded"
            );
            Ok(outcome)
        })
    }

    /// Forget everything about a session. Returns whether state existed.
    ///
    /// Unlike the other mutations the audit entry follows the delete, since it
    /// records whether anything was there. Repeating a reset is harmless.
    pub fn reset_session(&self, session_id: &str) -> Result<bool, TutorError> {
        self.locks.with_session(session_id, || {
            let existed = self.store.delete(session_id)?;
            self.audit.record(
                session_id,
                AuditKind::Reset,
                serde_json::json!({ "existed": existed }),
            )?;
            tracing::info!(session = session_id, existed, "session reset");
            Ok(existed)
        })
    }

    pub fn snapshot(&self, session_id: &str) -> Result<Option<LearnerState>, TutorError> {
        self.locks
            .with_session(session_id, || self.store.load(session_id))
    }

    pub fn list_sessions(&self) -> Result<Vec<String>, TutorError> {
        self.store.list()
    }

    pub fn render(&self, turn: &Turn) -> Result<Ui, TutorError> {
        present(turn, &self.templates, self.explainer.as_ref())
    }

    /// Transport entry point: grade first when the event carries an answer, then
    /// run one decision turn and render it.
    pub fn ingest(&self, event: &IngestEvent) -> Result<IngestResponse, TutorError> {
        if event.session_id.trim().is_empty() {
            return Err(TutorError::ValidationError(
                "session_id must not be empty".to_string(),
            ));
        }
        let hint = ActionHint::parse(event.action.as_deref());
        let question_id = match (hint, event.question_id.as_deref()) {
            (ActionHint::Answer, None) => {
                return Err(TutorError::ValidationError(
                    "question_id required when action=answer".to_string(),
                ));
            }
            (ActionHint::Answer, Some(id)) => Some(id),
            _ => None,
        };

        self.audit.record(
            &event.session_id,
            AuditKind::Ingest,
            serde_json::to_value(event)?,
        )?;

        let graded = match question_id {
            Some(id) => Some(
                match self.grade_answer(
                    &event.session_id,
                    id,
                    event.answer.as_deref().unwrap_or_default(),
                ) {
                    Ok(outcome) => GradeReport::Graded(outcome),
                    Err(err @ TutorError::UnknownQuestion(_)) => GradeReport::Failed {
                        error: err.code().to_string(),
                    },
                    Err(err) => return Err(err),
                },
            ),
            None => None,
        };

        let turn = self.decide_and_advance(
            &event.session_id,
            event.message.as_deref(),
            event.action.as_deref(),
        )?;
        let ui = self.render(&turn)?;
        Ok(IngestResponse {
            server_time: time::now_epoch_z(),
            graded,
            result: RenderedTurn { turn, ui },
        })
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "tutor",
        "version": "0.1.0",
        "description": "Session orchestration over the skill graph, question bank and learner state",
        "operations": [
            { "name": "ingest", "parameters": ["session_id", "message", "action", "question_id", "answer"] },
            { "name": "grade", "parameters": ["session_id", "question_id", "answer"] },
            { "name": "reset", "parameters": ["session_id"] },
            { "name": "session.show", "parameters": ["session_id"] }
        ],
        "actions": Action::ALL.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
        "hints": ["start", "content_only", "answer", "diagnostic_yes", "diagnostic_no"]
    })
}
