//! Database schema definitions for tutorpath's durable learner-state store.
//!
//! One SQLite file holds one row per session. Score and cursor maps are stored
//! as JSON text so the row shape does not change when skills are added.

pub const LEARNER_DB_NAME: &str = "learner.db";
pub const BROKER_EVENTS_NAME: &str = "broker.events.jsonl";
pub const AUDIT_LOG_NAME: &str = "audit.jsonl";

pub const LEARNER_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const LEARNER_SCHEMA_VERSION: u32 = 1;

pub const LEARNER_DB_SCHEMA_STATE: &str = "
    CREATE TABLE IF NOT EXISTS learner_state (
        session_id TEXT PRIMARY KEY,
        current_node TEXT NOT NULL,
        skipped_diagnostic INTEGER NOT NULL,
        scores_json TEXT NOT NULL,
        pending_json TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub const LEARNER_DB_UPSERT_STATE: &str = "
    INSERT INTO learner_state(session_id, current_node, skipped_diagnostic, scores_json, pending_json, updated_at)
    VALUES(?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(session_id) DO UPDATE SET
        current_node = excluded.current_node,
        skipped_diagnostic = excluded.skipped_diagnostic,
        scores_json = excluded.scores_json,
        pending_json = excluded.pending_json,
        updated_at = excluded.updated_at
";
