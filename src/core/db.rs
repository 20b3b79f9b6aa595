use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::TutorError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::TutorError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::TutorError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::TutorError::RusqliteError)?;
    Ok(conn)
}

pub fn learner_db_path(root: &Path) -> PathBuf {
    root.join(schemas::LEARNER_DB_NAME)
}

/// Create the learner-state schema in `db_path`; broker events land in `root`.
pub fn initialize_learner_db(root: &Path, db_path: &Path) -> Result<(), error::TutorError> {
    fs::create_dir_all(root).map_err(error::TutorError::IoError)?;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).map_err(error::TutorError::IoError)?;
    }

    let broker = DbBroker::new(root);
    broker.with_conn(db_path, "tutorpath", None, "learner.init", |conn| {
        conn.execute(schemas::LEARNER_DB_SCHEMA_META, [])?;
        conn.execute(schemas::LEARNER_DB_SCHEMA_STATE, [])?;
        conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES('schema_version', ?1)",
            params![schemas::LEARNER_SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    })?;

    tracing::debug!(path = %db_path.display(), "learner database ready");
    Ok(())
}
