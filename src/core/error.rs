use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Unknown question: {0}")]
    UnknownQuestion(String),
    #[error("Unknown skill: {0}")]
    UnknownSkill(String),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl TutorError {
    /// Stable machine-readable code for structured error output.
    pub fn code(&self) -> &'static str {
        match self {
            TutorError::RusqliteError(_) | TutorError::PersistenceFailure(_) => {
                "persistence_failure"
            }
            TutorError::IoError(_) => "io_error",
            TutorError::JsonError(_) => "invalid_json",
            TutorError::TomlError(_) => "invalid_config",
            TutorError::UnknownQuestion(_) => "unknown_question",
            TutorError::UnknownSkill(_) => "unknown_skill",
            TutorError::TemplateNotFound(_) => "template_not_found",
            TutorError::LockPoisoned(_) => "lock_poisoned",
            TutorError::ValidationError(_) => "validation_error",
            TutorError::NotFound(_) => "not_found",
        }
    }
}
