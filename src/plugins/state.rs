//! Learner state and the stores that keep it between requests.
//!
//! Two backends implement [`StateStore`]: a process-local map and a SQLite table
//! with one row per session. The orchestrator receives one of them at
//! construction and never reaches for global state.

use crate::core::broker::DbBroker;
use crate::core::config::TutorConfig;
use crate::core::db;
use crate::core::error::TutorError;
use crate::core::schemas;
use crate::core::store::{Store, StoreKind};
use crate::core::time;
use crate::plugins::questions::{Question, QuestionBank};
use crate::plugins::scoring::{self, ScoreMap, SkillScore};
use clap::{Parser, Subcommand};
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerState {
    pub session_id: String,
    pub current_node: String,
    pub skipped_diagnostic: bool,
    pub scores: ScoreMap,
    /// skill id -> index of the next undelivered question
    pub pending_index: BTreeMap<String, usize>,
}

impl LearnerState {
    pub fn new(session_id: &str, root_skill: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            current_node: root_skill.to_string(),
            skipped_diagnostic: false,
            scores: ScoreMap::new(),
            pending_index: BTreeMap::new(),
        }
    }

    pub fn cursor(&self, skill: &str) -> usize {
        self.pending_index.get(skill).copied().unwrap_or(0)
    }

    /// Questions for `skill` that this session has not been shown yet.
    pub fn pending_items(&self, skill: &str, bank: &QuestionBank) -> usize {
        bank.count_for(skill).saturating_sub(self.cursor(skill))
    }

    /// Hand out the question under the cursor and move the cursor past it.
    /// Returns `None` once the skill is exhausted; the cursor does not move then.
    pub fn take_next_question<'b>(
        &mut self,
        skill: &str,
        bank: &'b QuestionBank,
    ) -> Option<&'b Question> {
        let idx = self.cursor(skill);
        let question = bank.at(skill, idx)?;
        self.pending_index.insert(skill.to_string(), idx + 1);
        Some(question)
    }

    pub fn record_grade(&mut self, skill: &str, correct: bool, total_for_node: u32) -> SkillScore {
        scoring::update_score(&mut self.scores, skill, correct, total_for_node)
    }
}

/// Keyed persistence for [`LearnerState`]. Every call is one atomic round trip.
pub trait StateStore: Send + Sync {
    fn kind(&self) -> StoreKind;
    fn load(&self, session_id: &str) -> Result<Option<LearnerState>, TutorError>;
    /// Insert or replace the row for `state.session_id`.
    fn save(&self, state: &LearnerState) -> Result<(), TutorError>;
    /// Returns whether anything was deleted.
    fn delete(&self, session_id: &str) -> Result<bool, TutorError>;
    /// Known session ids, sorted.
    fn list(&self) -> Result<Vec<String>, TutorError>;
}

#[derive(Default)]
pub struct MemoryStateStore {
    sessions: Mutex<BTreeMap<String, LearnerState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, LearnerState>>, TutorError> {
        self.sessions
            .lock()
            .map_err(|_| TutorError::LockPoisoned("memory state store"))
    }
}

impl StateStore for MemoryStateStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn load(&self, session_id: &str) -> Result<Option<LearnerState>, TutorError> {
        Ok(self.sessions()?.get(session_id).cloned())
    }

    fn save(&self, state: &LearnerState) -> Result<(), TutorError> {
        self.sessions()?
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<bool, TutorError> {
        Ok(self.sessions()?.remove(session_id).is_some())
    }

    fn list(&self) -> Result<Vec<String>, TutorError> {
        Ok(self.sessions()?.keys().cloned().collect())
    }
}

/// One `learner_state` row per session. Score and cursor maps travel as JSON.
pub struct SqliteStateStore {
    broker: DbBroker,
    db_path: PathBuf,
}

fn persistence(op: &str, session_id: &str, err: TutorError) -> TutorError {
    match err {
        TutorError::PersistenceFailure(_) => err,
        other => TutorError::PersistenceFailure(format!("{op} '{session_id}': {other}")),
    }
}

impl SqliteStateStore {
    /// Open (and create if needed) the learner database. Broker events go to `root`.
    pub fn open(root: &Path, db_path: &Path) -> Result<Self, TutorError> {
        db::initialize_learner_db(root, db_path)
            .map_err(|e| persistence("init", &db_path.display().to_string(), e))?;
        Ok(Self {
            broker: DbBroker::new(root),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl StateStore for SqliteStateStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }

    fn load(&self, session_id: &str) -> Result<Option<LearnerState>, TutorError> {
        self.broker
            .with_conn(
                &self.db_path,
                "tutorpath",
                Some(session_id),
                "state.load",
                |conn| {
                    let row = conn
                        .query_row(
                            "SELECT current_node, skipped_diagnostic, scores_json, pending_json
                             FROM learner_state WHERE session_id = ?1",
                            params![session_id],
                            |row| {
                                Ok((
                                    row.get::<_, String>(0)?,
                                    row.get::<_, i64>(1)?,
                                    row.get::<_, String>(2)?,
                                    row.get::<_, String>(3)?,
                                ))
                            },
                        )
                        .optional()?;

                    let Some((current_node, skipped, scores_json, pending_json)) = row else {
                        return Ok(None);
                    };
                    Ok(Some(LearnerState {
                        session_id: session_id.to_string(),
                        current_node,
                        skipped_diagnostic: skipped != 0,
                        scores: serde_json::from_str(&scores_json)?,
                        pending_index: serde_json::from_str(&pending_json)?,
                    }))
                },
            )
            .map_err(|e| persistence("load", session_id, e))
    }

    fn save(&self, state: &LearnerState) -> Result<(), TutorError> {
        let scores_json = serde_json::to_string(&state.scores)?;
        let pending_json = serde_json::to_string(&state.pending_index)?;
        self.broker
            .with_conn(
                &self.db_path,
                "tutorpath",
                Some(&state.session_id),
                "state.save",
                |conn| {
                    conn.execute(
                        schemas::LEARNER_DB_UPSERT_STATE,
                        params![
                            state.session_id,
                            state.current_node,
                            state.skipped_diagnostic as i64,
                            scores_json,
                            pending_json,
                            time::now_epoch_z(),
                        ],
                    )?;
                    Ok(())
                },
            )
            .map_err(|e| persistence("save", &state.session_id, e))
    }

    fn delete(&self, session_id: &str) -> Result<bool, TutorError> {
        self.broker
            .with_conn(
                &self.db_path,
                "tutorpath",
                Some(session_id),
                "state.delete",
                |conn| {
                    let n = conn.execute(
                        "DELETE FROM learner_state WHERE session_id = ?1",
                        params![session_id],
                    )?;
                    Ok(n > 0)
                },
            )
            .map_err(|e| persistence("delete", session_id, e))
    }

    fn list(&self) -> Result<Vec<String>, TutorError> {
        self.broker
            .with_conn(&self.db_path, "tutorpath", None, "state.list", |conn| {
                let mut stmt =
                    conn.prepare("SELECT session_id FROM learner_state ORDER BY session_id")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .map_err(|e| persistence("list", "*", e))
    }
}

/// Build the store the configuration asks for.
pub fn open_state_store(
    store: &Store,
    config: &TutorConfig,
) -> Result<Box<dyn StateStore>, TutorError> {
    match store.kind {
        StoreKind::Memory => Ok(Box::new(MemoryStateStore::new())),
        StoreKind::Sqlite => Ok(Box::new(SqliteStateStore::open(
            store.root(),
            &config.db_path(store.root()),
        )?)),
    }
}

// --- CLI ---

#[derive(Parser, Debug)]
#[clap(name = "session", about = "Inspect persisted learner state")]
pub struct SessionCli {
    #[clap(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Print one session's state as JSON.
    Show {
        #[clap(long)]
        session: String,
    },
    /// List known session ids.
    List,
}

pub fn run_session_cli(store: &dyn StateStore, cli: SessionCli) -> Result<(), TutorError> {
    match cli.command {
        SessionCommand::Show { session } => {
            let state = store
                .load(&session)?
                .ok_or_else(|| TutorError::NotFound(format!("session '{}'", session)))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        SessionCommand::List => {
            let ids = store.list()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "backend": store.kind().as_str(),
                    "sessions": ids,
                }))?
            );
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "session",
        "version": "0.1.0",
        "description": "Per-session learner state: focus skill, scores, question cursors",
        "commands": [
            { "name": "show", "parameters": ["session"] },
            { "name": "list", "parameters": [] }
        ],
        "backends": ["memory", "sqlite"],
        "storage": [schemas::LEARNER_DB_NAME, schemas::BROKER_EVENTS_NAME]
    })
}
