//! Embedded curriculum data.
//!
//! The default skill graph, question bank and rationale templates are baked into the
//! binary so a fresh install works without any data directory. A configured data
//! directory overrides them file by file.

use crate::core::error::TutorError;
use std::fs;
use std::path::Path;

/// Macro to embed data files at compile time as text.
///
/// Generates:
/// - Public constants for each embedded file
/// - `get_embedded(name)` function for lookup
/// - `list_embedded()` function for discovery
macro_rules! embedded_data {
    ($($path:expr => $const_name:ident),* $(,)?) => {
        $(
            pub const $const_name: &str =
                include_str!(concat!("../../data/", $path));
        )*

        pub fn get_embedded(name: &str) -> Option<&'static str> {
            match name {
                $( $path => Some($const_name), )*
                _ => None,
            }
        }

        pub fn list_embedded() -> Vec<&'static str> {
            vec![ $( $path, )* ]
        }
    };
}

embedded_data! {
    "skill_graph.toml" => EMBEDDED_SKILL_GRAPH,
    "questions.toml" => EMBEDDED_QUESTIONS,
    "explanations.toml" => EMBEDDED_EXPLANATIONS,
}

/// Read `name` from `dir` when present there, otherwise the embedded copy.
pub fn load_data(dir: Option<&Path>, name: &str) -> Result<String, TutorError> {
    if let Some(dir) = dir {
        let path = dir.join(name);
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading data override");
            return fs::read_to_string(&path).map_err(TutorError::IoError);
        }
    }
    get_embedded(name)
        .map(str::to_string)
        .ok_or_else(|| TutorError::NotFound(format!("data file '{}'", name)))
}
