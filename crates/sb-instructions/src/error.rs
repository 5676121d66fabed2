//! Error types for the instruction source

use sb_models::InstructionKind;
use std::path::PathBuf;

/// Errors raised while reading or writing instruction files
#[derive(Debug, thiserror::Error)]
pub enum InstructionError {
    /// File could not be opened, created or flushed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row appended outside of a write session
    #[error("no file opened")]
    NoFileOpened,

    /// Row shape differs from the session's canonical shape
    #[error("type mismatch: expected {expected} entry, got {actual}")]
    TypeMismatch {
        expected: InstructionKind,
        actual: InstructionKind,
    },

    /// Row does not fit the requested shape (missing, extra or misnamed column)
    #[error("malformed {kind} row in {path} at line {line}: {source}")]
    Row {
        kind: InstructionKind,
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    /// Failure while encoding a row
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl InstructionError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller can fix this by correcting its input
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoFileOpened | Self::TypeMismatch { .. } | Self::Row { .. }
        )
    }
}
