//! Append-only audit trail of learner interactions.
//!
//! One JSON object per line. Payloads are fingerprinted so a later reader can
//! detect edits to individual entries.

use crate::core::error::TutorError;
use crate::core::time;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Ingest,
    Decision,
    Graded,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub ts: String,
    pub event_id: String,
    pub session_id: String,
    pub kind: AuditKind,
    pub payload: serde_json::Value,
    pub payload_sha256: String,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(
        &self,
        session_id: &str,
        kind: AuditKind,
        payload: serde_json::Value,
    ) -> Result<(), TutorError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let payload_sha256 = format!(
            "{:x}",
            Sha256::digest(serde_json::to_string(&payload)?.as_bytes())
        );
        let entry = AuditEntry {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            session_id: session_id.to_string(),
            kind,
            payload,
            payload_sha256,
        };

        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(f, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Entries for one session, oldest first.
    pub fn entries_for(&self, session_id: &str) -> Result<Vec<AuditEntry>, TutorError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let mut out = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let entry: AuditEntry = serde_json::from_str(line)?;
            if entry.session_id == session_id {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

/// Recompute a stored entry's fingerprint.
pub fn verify_entry(entry: &AuditEntry) -> bool {
    serde_json::to_string(&entry.payload)
        .map(|raw| format!("{:x}", Sha256::digest(raw.as_bytes())) == entry.payload_sha256)
        .unwrap_or(false)
}
