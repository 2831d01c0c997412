//! Dataset error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while assembling a windowed dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Data not found at {path:?}: {reason}")]
    DataNotFound { path: PathBuf, reason: String },

    #[error("Malformed row in {source_name} at line {line}: {message}")]
    MalformedRow {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("No rows between {start} and {end}")]
    EmptyRange { start: String, end: String },

    #[error("Invalid date '{0}', expected '%Y-%m-%d %H:%M:%S' or '-1'")]
    InvalidDate(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DatasetError {
    pub(crate) fn not_found(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(
        source_name: impl Into<String>,
        line: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedRow {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;
