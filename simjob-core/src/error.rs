//! Error taxonomy shared by every SimJob crate
//!
//! Every failure the orchestration layer can observe is one of these
//! variants. Runner-side failures are recorded on the job as [`ErrorInfo`]
//! (via [`SimJobError::kind`]); API-side failures become status responses.
//!
//! [`ErrorInfo`]: crate::domain::job::ErrorInfo

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for SimJob operations
pub type Result<T> = std::result::Result<T, SimJobError>;

/// Errors that can occur while orchestrating simulation jobs
#[derive(Debug, Error)]
pub enum SimJobError {
    /// Malformed or missing request fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// A job for the same parameter record is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown job, record or artifact
    #[error("Not found: {0}")]
    NotFound(String),

    /// Simulator exited non-zero, could not be started or timed out
    #[error("External process error: {0}")]
    ExternalProcess(String),

    /// Simulator exceeded its wall-clock budget and was killed
    #[error("External process error: timed out after {limit:?}")]
    Timeout { limit: Duration },

    /// Raw output lacks one of the required columns
    #[error("Schema error: missing required field(s) {missing:?}, fields present: {present:?}")]
    Schema {
        missing: Vec<String>,
        present: Vec<String>,
    },

    /// More than one raw output candidate in the result directory
    #[error("Ambiguous output: {} candidate files in {}", .candidates.len(), .dir.display())]
    AmbiguousOutput {
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// No raw output candidate in the result directory
    #[error("Missing output: no *.{extension} file in {}", .dir.display())]
    MissingOutput { dir: PathBuf, extension: String },

    /// A data row whose value column is not a number
    #[error("Invalid value {value:?} in column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    /// Route name already present in the registry
    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    /// Report document could not be produced
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid configuration or descriptor
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure tied to a path
    #[error("I/O error at {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure without a path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse, serializable classification of a [`SimJobError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    ExternalProcess,
    Timeout,
    Schema,
    AmbiguousOutput,
    MissingOutput,
    InvalidValue,
    DuplicateRoute,
    Render,
    Config,
    Io,
    Serialization,
}

impl SimJobError {
    /// Attach a path to an I/O error
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Classification used when the error is recorded on a job
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ExternalProcess(_) => ErrorKind::ExternalProcess,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::AmbiguousOutput { .. } => ErrorKind::AmbiguousOutput,
            Self::MissingOutput { .. } => ErrorKind::MissingOutput,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::DuplicateRoute(_) => ErrorKind::DuplicateRoute,
            Self::Render(_) => ErrorKind::Render,
            Self::Config(_) => ErrorKind::Config,
            Self::File { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Check if this error means "unknown id or missing artifact"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error is caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflict(_))
    }
}
