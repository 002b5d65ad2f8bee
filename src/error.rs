//! Error types for log correction.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for correction operations.
pub type FixResult<T> = Result<T, FixError>;

/// Errors that can occur while correcting a log.
#[derive(Debug, Error)]
pub enum FixError {
    /// A data row could not be decoded.
    #[error("malformed row {line}: {reason}")]
    MalformedRow {
        /// 1-based row number within the document body.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// The requested correction mode does not exist.
    #[error("unknown fix type specified: '{0}'")]
    UnknownMode(String),

    /// Unwrap configuration was rejected.
    #[error("invalid unwrap configuration: {0}")]
    InvalidConfig(String),

    /// File read or write failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// CSV read or write failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FixError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        FixError::MalformedRow {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FixError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stamp a row number onto a row error raised without one.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            FixError::MalformedRow { reason, .. } => FixError::MalformedRow { line, reason },
            other => other,
        }
    }
}
