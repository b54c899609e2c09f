//! Error types with fix suggestions

use std::path::PathBuf;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum WildcardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read wildcard file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not decode wildcard file '{path}' as UTF-8 or latin-1")]
    Decode { path: PathBuf },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid search path configuration: {0}")]
    Config(String),
}

impl FixSuggestion for WildcardError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            WildcardError::Io(_) => Some("Check file path and permissions"),
            WildcardError::FileRead { .. } => {
                Some("Verify the wildcard directory is readable and the file still exists")
            }
            WildcardError::Decode { .. } => {
                Some("Wildcard files must be plain text; remove or re-save the file as UTF-8")
            }
            WildcardError::Json(_) => {
                Some("Check wildcard_paths.json for syntax errors")
            }
            WildcardError::Config(_) => {
                Some("Check wildcard_paths.json: it should be a JSON array of directory paths")
            }
        }
    }
}
