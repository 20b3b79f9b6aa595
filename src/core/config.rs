//! `tutorpath.toml` loading.
//!
//! Every field has a default, so a missing file yields a working in-memory
//! configuration. Environment overrides are applied after the file.

use crate::core::error::TutorError;
use crate::core::schemas;
use crate::core::store::StoreKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "tutorpath.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct TutorConfig {
    pub store: StoreSection,
    pub policy: PolicySection,
    pub data: DataSection,
    pub audit: AuditSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreKind,
    /// SQLite file, relative to the store root unless absolute
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PolicySection {
    pub ready_threshold: u32,
    pub items_per_node: u32,
    pub root_skill: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct DataSection {
    /// Directory with `skill_graph.toml`, `questions.toml`, `explanations.toml`.
    /// Files missing from it fall back to the embedded defaults.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuditSection {
    pub enabled: bool,
    pub file: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreKind::Memory,
            path: PathBuf::from(schemas::LEARNER_DB_NAME),
        }
    }
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            ready_threshold: 2,
            items_per_node: 3,
            root_skill: "prereq.math.basics".to_string(),
        }
    }
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: true,
            file: PathBuf::from(schemas::AUDIT_LOG_NAME),
        }
    }
}

impl TutorConfig {
    pub fn from_toml(raw: &str) -> Result<Self, TutorError> {
        toml::from_str(raw).map_err(|e| TutorError::ValidationError(e.to_string()))
    }

    /// Load `<dir>/tutorpath.toml`; no file means defaults.
    pub fn load(dir: &Path) -> Result<Self, TutorError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(TutorError::IoError)?;
        Self::from_toml(&content)
    }

    /// Load and then apply process environment overrides.
    pub fn load_with_env(dir: &Path) -> Result<Self, TutorError> {
        let mut config = Self::load(dir)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TUTORPATH_USE_SQLITE") {
            self.store.backend = if parse_bool(&v) {
                StoreKind::Sqlite
            } else {
                StoreKind::Memory
            };
        }
        if let Some(v) = lookup("TUTORPATH_DB_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TUTORPATH_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TUTORPATH_AUDIT") {
            self.audit.enabled = parse_bool(&v);
        }
        if let Some(v) = lookup("TUTORPATH_ROOT_SKILL").filter(|v| !v.trim().is_empty()) {
            self.policy.root_skill = v.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), TutorError> {
        if self.policy.ready_threshold == 0 {
            return Err(TutorError::ValidationError(
                "policy.ready_threshold must be at least 1".to_string(),
            ));
        }
        if self.policy.root_skill.trim().is_empty() {
            return Err(TutorError::ValidationError(
                "policy.root_skill must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, TutorError> {
        toml::to_string_pretty(self).map_err(|e| TutorError::ValidationError(e.to_string()))
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.store.path)
    }

    pub fn audit_path(&self, root: &Path) -> Option<PathBuf> {
        self.audit.enabled.then(|| resolve(root, &self.audit.file))
    }

    pub fn data_dir(&self, root: &Path) -> Option<PathBuf> {
        self.data.dir.as_deref().map(|d| resolve(root, d))
    }
}

fn resolve(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
