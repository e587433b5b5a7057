//! Field identifiers, data types and typed field values

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix reserved for user-defined fields
pub const CUSTOM_PREFIX: char = '#';

/// Suffix appended to a series field to form its position companion
pub const INDEX_SUFFIX: &str = "_index";

/// Identifier of a metadata field (e.g. `title`, `#mytag`, `series_index`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for user-defined fields
    pub fn is_custom(&self) -> bool {
        self.0.starts_with(CUSTOM_PREFIX)
    }

    /// The `_index` companion id of this field
    pub fn index_companion(&self) -> FieldId {
        FieldId(format!("{}{}", self.0, INDEX_SUFFIX))
    }

    /// The parent id if this looks like an `_index` companion
    pub fn index_parent(&self) -> Option<FieldId> {
        self.0
            .strip_suffix(INDEX_SUFFIX)
            .filter(|parent| !parent.is_empty())
            .map(FieldId::new)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        FieldId::new(id)
    }
}

impl From<String> for FieldId {
    fn from(id: String) -> Self {
        FieldId(id)
    }
}

/// Data type of a field, which drives conversion on import and formatting on export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataType {
    Text,
    Comments,
    Integer,
    Float,
    Bool,
    Date,
    Series,
    SeriesIndex,
    /// Several values in one cell, split on `separator`
    MultiValue { separator: String },
}

impl DataType {
    pub fn is_series(&self) -> bool {
        matches!(self, DataType::Series)
    }

    /// Convert a trimmed, non-empty cell into a typed value
    pub fn convert(&self, raw: &str) -> std::result::Result<FieldValue, ConversionError> {
        match self {
            DataType::Text | DataType::Comments | DataType::Series => {
                Ok(FieldValue::Text(raw.to_string()))
            }
            DataType::Integer => raw
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| ConversionError::new(raw, "expected an integer")),
            DataType::Float => parse_finite(raw).map(FieldValue::Float),
            DataType::SeriesIndex => {
                let position = parse_finite(raw)?;
                if position < 0.0 {
                    return Err(ConversionError::new(
                        raw,
                        "series position cannot be negative",
                    ));
                }
                Ok(FieldValue::Float(position))
            }
            DataType::Bool => match raw.to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Ok(FieldValue::Bool(true)),
                "no" | "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(ConversionError::new(raw, "expected yes/no or true/false")),
            },
            DataType::Date => parse_date(raw).map(FieldValue::Date),
            DataType::MultiValue { separator } => {
                let items: Vec<String> = raw
                    .split(separator.as_str())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect();
                if items.is_empty() {
                    return Err(ConversionError::new(raw, "no value between separators"));
                }
                Ok(FieldValue::List(items))
            }
        }
    }
}

fn parse_finite(raw: &str) -> std::result::Result<f64, ConversionError> {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ConversionError::new(raw, "expected a number")),
    }
}

fn parse_date(raw: &str) -> std::result::Result<DateTime<Utc>, ConversionError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ConversionError::new(raw, "expected a date (YYYY-MM-DD or RFC 3339)"))
}

/// A cell that could not be converted to its field's data type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{value}': {reason}")]
pub struct ConversionError {
    pub value: String,
    pub reason: String,
}

impl ConversionError {
    fn new(value: &str, reason: &str) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A typed field value held by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<String>),
}

impl FieldValue {
    /// Format as a CSV display string; `data_type` supplies the list separator
    pub fn format(&self, data_type: &DataType) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(true) => "Yes".to_string(),
            FieldValue::Bool(false) => "No".to_string(),
            FieldValue::Date(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            FieldValue::List(items) => {
                let joiner = match data_type {
                    DataType::MultiValue { separator } if separator.trim() == "&" => {
                        " & ".to_string()
                    }
                    DataType::MultiValue { separator } => format!("{} ", separator.trim_end()),
                    _ => ", ".to_string(),
                };
                items.join(&joiner)
            }
        }
    }
}

/// Where a field comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FieldSource {
    /// Field defined by the record store itself
    BuiltIn,
    /// Position companion of a series field
    IndexCompanion { parent: FieldId },
    /// User-defined field
    Custom,
    /// Name of the library, identical for every record
    LibraryName,
}

impl FieldSource {
    /// Preference when several fields share one display name (lower wins)
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            FieldSource::BuiltIn => 0,
            FieldSource::IndexCompanion { .. } => 1,
            FieldSource::Custom => 2,
            FieldSource::LibraryName => 3,
        }
    }
}

/// A field resolved by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub display_name: String,
    pub data_type: DataType,
    pub source: FieldSource,
    /// True when the catalog also offers an `_index` companion for this field
    pub has_index_companion: bool,
}
