//! Error types for visa-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in visa-core
///
/// Malformed values inside a row are never errors; they are coerced to their
/// documented defaults during normalization.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{name}': {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// A JSON source was readable but not an array of objects
    #[error("invalid JSON rows in '{name}': {message}")]
    JsonShape { name: String, message: String },

    /// Filename matches none of the known export formats
    #[error("unrecognized filename pattern: '{0}'")]
    UnsupportedFile(String),

    /// File extension is neither csv nor json
    #[error("unsupported extension '{extension}' for '{name}' (export spreadsheets to CSV first)")]
    UnsupportedExtension { name: String, extension: String },

    /// Edit addressed a record id that is not in the dataset
    #[error("record {0} not found")]
    RecordNotFound(i64),

    /// Bulk operation called with an empty selection
    #[error("no rows selected")]
    NoRowsSelected,

    /// Configuration file could not be used
    #[error("invalid config '{path}': {message}")]
    Config { path: PathBuf, message: String },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable snake_case name of the error variant, for reports across FFI
    pub fn kind(&self) -> &'static str {
        match self {
            Error::FileRead { .. } => "file_read",
            Error::Csv { .. } => "csv",
            Error::JsonShape { .. } => "json_shape",
            Error::UnsupportedFile(_) => "unsupported_file",
            Error::UnsupportedExtension { .. } => "unsupported_extension",
            Error::RecordNotFound(_) => "record_not_found",
            Error::NoRowsSelected => "no_rows_selected",
            Error::Config { .. } => "config",
            Error::WalkDir(_) => "walk_dir",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }

    /// Whether the session can carry on unchanged after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::RecordNotFound(_)
                | Error::NoRowsSelected
                | Error::UnsupportedFile(_)
                | Error::UnsupportedExtension { .. }
        )
    }
}
