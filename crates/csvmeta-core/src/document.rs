//! In-memory representation of a CSV exchange document

use crate::error::{Error, MalformedKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum number of columns in a document
pub const MIN_COLUMNS: usize = 2;

/// Minimum number of data rows (the header is not counted)
pub const MIN_ROWS: usize = 1;

/// A header plus data rows, every row exactly as wide as the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDocument")]
pub struct CsvDocument {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Unchecked form of a document, validated on deserialization
#[derive(Deserialize)]
struct RawDocument {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawDocument> for CsvDocument {
    type Error = Error;

    fn try_from(raw: RawDocument) -> Result<Self> {
        CsvDocument::new(raw.header, raw.rows)
    }
}

impl CsvDocument {
    /// Build a document, checking the structural invariants
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if header.len() < MIN_COLUMNS {
            return Err(Error::malformed(
                MalformedKind::TooFewColumns,
                format!(
                    "found {} column(s), at least {} are required",
                    header.len(),
                    MIN_COLUMNS
                ),
            ));
        }

        let mut seen = HashSet::new();
        for name in &header {
            if !seen.insert(name.as_str()) {
                return Err(Error::malformed(
                    MalformedKind::DuplicateHeader,
                    format!("column '{}' appears more than once in the header", name),
                ));
            }
        }

        if rows.len() < MIN_ROWS {
            return Err(Error::malformed(
                MalformedKind::TooFewLines,
                "a header and at least one data row are required",
            ));
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(Error::malformed(
                    MalformedKind::FieldCount,
                    format!(
                        "row {} has {} field(s) but the header has {}",
                        idx + 1,
                        row.len(),
                        header.len()
                    ),
                ));
            }
        }

        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Get the number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column index by header name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Get a cell by data row and column index
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.header, self.rows)
    }
}
