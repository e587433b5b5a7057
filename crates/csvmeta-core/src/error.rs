//! Error types for csvmeta-core

use crate::field::FieldId;
use crate::store::RecordId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in csvmeta-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV document violates the exchange format
    #[error("malformed CSV ({kind}): {message}")]
    MalformedCsv { kind: MalformedKind, message: String },

    /// CSV error from the csv crate while writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No field was selected for export
    #[error("no field selected, select at least one field to export")]
    EmptySelection,

    /// No CSV column resolves to the record key field
    #[error("no column maps to the key field '{field}'")]
    MissingKeyColumn { field: FieldId },

    /// A field id that the catalog does not know
    #[error("unknown field '{0}'")]
    UnknownField(FieldId),

    /// The record store refused an update
    #[error("record store failed to update record {record}: {message}")]
    Store { record: RecordId, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(kind: MalformedKind, message: impl Into<String>) -> Self {
        Error::MalformedCsv {
            kind,
            message: message.into(),
        }
    }
}

/// Classification of a structural CSV failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// The source contains no data at all
    Empty,
    /// Fewer than two lines (header plus one data row)
    TooFewLines,
    /// Fewer than two columns
    TooFewColumns,
    /// A row is not as wide as the header
    FieldCount,
    /// Two header cells carry the same name
    DuplicateHeader,
    /// The source is not valid UTF-8
    Encoding,
    /// Any other parser diagnostic
    Syntax,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MalformedKind::Empty => "empty file",
            MalformedKind::TooFewLines => "too few lines",
            MalformedKind::TooFewColumns => "too few columns",
            MalformedKind::FieldCount => "field count mismatch",
            MalformedKind::DuplicateHeader => "duplicate header",
            MalformedKind::Encoding => "encoding",
            MalformedKind::Syntax => "syntax",
        };
        f.write_str(name)
    }
}
