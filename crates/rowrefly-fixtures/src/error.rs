//! Fixture loading errors

use rowrefly_core::RegistryError;
use std::path::Path;

/// Fixture loading errors
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to read {path}: {reason}")]
    IoError { path: String, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("Column schema {path} does not name a known table ({{table}}_{{column}}.schema.json)")]
    OrphanColumnSchema { path: String },

    #[error("Table '{table}' is defined more than once (again in {path})")]
    DuplicateTable { table: String, path: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl FixtureError {
    pub(crate) fn io(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::IoError {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    /// Directory walk failure, reported against the entry that failed
    pub(crate) fn walk(dir: &Path, error: walkdir::Error) -> Self {
        let path = error.path().unwrap_or(dir).to_path_buf();
        Self::io(&path, error)
    }

    pub(crate) fn parse(path: &Path, error: impl std::fmt::Display) -> Self {
        Self::ParseError {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, FixtureError> {
    std::fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))
}
