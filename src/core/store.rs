//! Store handle for tutorpath's learner-state workspace.
//!
//! A store pairs a persistence backend with the directory that holds its files
//! (SQLite database, broker event log, audit log). The backend is chosen by
//! configuration and handed to the orchestrator at construction time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistence backend for learner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local map; state is lost when the process exits.
    #[default]
    Memory,
    /// One row per session in `learner.db`.
    Sqlite,
}

impl StoreKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "volatile" => Some(StoreKind::Memory),
            "sqlite" | "db" | "durable" => Some(StoreKind::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Sqlite => "sqlite",
        }
    }
}

/// Store handle representing a tutorpath state workspace.
#[derive(Debug, Clone)]
pub struct Store {
    pub kind: StoreKind,
    /// Directory holding the store's files
    pub root: PathBuf,
}

impl Store {
    pub fn new(kind: StoreKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
