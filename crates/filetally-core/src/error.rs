//! Error types for counting runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that terminate a run.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Malformed or missing configuration value.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Base path is not a directory.
    #[error("Base path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The traversal stopped before covering the whole tree.
    #[error("Walk of {path} aborted: {message}")]
    WalkAborted { path: PathBuf, message: String },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TallyError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Failure to derive a relative path or group key for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The file does not lie under the base path.
    #[error("{path} is not under base path {base}")]
    InvalidPath { path: PathBuf, base: PathBuf },

    /// The relative path is shorter than the grouping index.
    #[error("relative path {relative:?} is shorter than grouping index {index}")]
    InvalidGroupingIndex { relative: String, index: usize },
}

/// Kind of warning absorbed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A directory or entry could not be read; its subtree was skipped.
    TraversalError,
    /// Metadata of a file could not be read.
    MetadataError,
    /// A file could not be classified into a group.
    Unclassifiable,
}

/// Non-fatal warning encountered during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl TallyWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for an unclassifiable file.
    pub fn unclassifiable(path: impl Into<PathBuf>, error: &ClassifyError) -> Self {
        Self::new(path, error.to_string(), WarningKind::Unclassifiable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_error_io() {
        let err = TallyError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, TallyError::PermissionDenied { .. }));

        let err = TallyError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(matches!(err, TallyError::Io { .. }));
    }

    #[test]
    fn test_unclassifiable_warning() {
        let err = ClassifyError::InvalidGroupingIndex {
            relative: "a.txt".into(),
            index: 12,
        };
        let warning = TallyWarning::unclassifiable("/base/a.txt", &err);
        assert_eq!(warning.kind, WarningKind::Unclassifiable);
        assert!(warning.message.contains("grouping index 12"));
    }
}
