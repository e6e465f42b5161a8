//! Error types for seqlsh.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::FormatError;

/// Errors that can occur while building, querying or persisting an index.
#[derive(Debug, Error)]
pub enum LshError {
    /// Invalid parameter value (zero width, zero stages, zero cache limit, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Signature width does not match the table width.
    #[error("signature width mismatch: table expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A loaded table was created with different parameters than the caller expects.
    #[error(
        "table at {} has parameters {found} but caller expects {expected}",
        .path.display()
    )]
    ConfigMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// The control file exists but cannot be parsed.
    #[error("malformed control file {}: {reason}", .path.display())]
    Control { path: PathBuf, reason: String },

    /// I/O error with the offending path.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A bucket could not be encoded for writing.
    #[error("cannot encode bucket file {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    /// A bucket file could not be decoded, or holds signatures of the wrong width.
    #[error("corrupt bucket file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

impl LshError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, LshError>;
