//! Update-merge of an imported CSV document into existing records
//!
//! Each cell is classified independently:
//! - empty (after trimming) leaves the field unchanged
//! - `NULL` (after trimming, exact case) deletes the field's value
//! - anything else is trimmed, converted to the field's type and set
//!
//! Problems are collected rather than raised: an unknown record skips its
//! row, an unknown column skips that column, and a cell that fails to convert
//! is left out of its record's update while the record's other cells still
//! apply.

use crate::catalog::{FieldCatalog, ID_FIELD};
use crate::dialect::NULL_SENTINEL;
use crate::document::CsvDocument;
use crate::error::{Error, Result};
use crate::field::{ConversionError, FieldDescriptor, FieldId};
use crate::store::{FieldUpdate, RecordId, RecordStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What a single cell asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision<'a> {
    /// Leave the field untouched
    NoOp,
    /// Clear the field's value
    Delete,
    /// Set the field to this trimmed text
    Set(&'a str),
}

/// Classify a raw cell; whitespace is trimmed before anything else
pub fn merge_decision(cell: &str) -> MergeDecision<'_> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        MergeDecision::NoOp
    } else if trimmed == NULL_SENTINEL {
        MergeDecision::Delete
    } else {
        MergeDecision::Set(trimmed)
    }
}

/// Import settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Field whose column identifies the record of each row
    pub key_field: FieldId,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            key_field: FieldId::new(ID_FIELD),
        }
    }
}

/// Why a row's key did not identify a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSkipReason {
    /// No record carries the key
    NoMatch,
    /// Several records carry the key
    Ambiguous(usize),
}

impl fmt::Display for RecordSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSkipReason::NoMatch => write!(f, "no record matches"),
            RecordSkipReason::Ambiguous(count) => write!(f, "{} records match", count),
        }
    }
}

/// A row whose key identifies no single record. `row` is 1-based over data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("row {row}: key '{key}' skipped, {reason}")]
pub struct UnknownRecordWarning {
    pub row: usize,
    pub key: String,
    pub reason: RecordSkipReason,
}

/// Why a column was left out of the import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSkipReason {
    /// The header names no known field
    NoMatchingField,
    /// The field is never written on import
    ReadOnly,
    /// An earlier column already maps to this field
    DuplicateField(FieldId),
}

impl fmt::Display for ColumnSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSkipReason::NoMatchingField => write!(f, "no matching field"),
            ColumnSkipReason::ReadOnly => write!(f, "field is read-only"),
            ColumnSkipReason::DuplicateField(field) => {
                write!(f, "field '{}' is already mapped by another column", field)
            }
        }
    }
}

/// A column skipped for the whole document. `column` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("column {column} '{name}' skipped: {reason}")]
pub struct UnknownColumnWarning {
    pub column: usize,
    pub name: String,
    pub reason: ColumnSkipReason,
}

/// A cell whose text does not fit its field's type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}, column '{column}' (record {record}): {error}")]
pub struct FieldConversionError {
    pub row: usize,
    pub record: RecordId,
    pub column: String,
    pub field: FieldId,
    #[source]
    pub error: ConversionError,
}

/// A record update the store refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row} (record {record}): {message}")]
pub struct UpdateFailure {
    pub row: usize,
    pub record: RecordId,
    pub message: String,
}

/// Pending changes for one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub row: usize,
    pub record: RecordId,
    pub changes: FieldUpdate,
}

/// Every pending change of a document, computed without touching the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    pub updates: Vec<RecordUpdate>,
    /// Rows that matched a record but changed nothing
    pub unchanged_count: usize,
    pub skipped_rows: Vec<UnknownRecordWarning>,
    pub skipped_columns: Vec<UnknownColumnWarning>,
    pub conversion_errors: Vec<FieldConversionError>,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub updated_count: usize,
    pub unchanged_count: usize,
    pub skipped_rows: Vec<UnknownRecordWarning>,
    pub skipped_columns: Vec<UnknownColumnWarning>,
    pub conversion_errors: Vec<FieldConversionError>,
    pub failed_updates: Vec<UpdateFailure>,
}

impl MergeReport {
    /// True when every row and column was applied without problems
    pub fn is_clean(&self) -> bool {
        self.skipped_rows.is_empty()
            && self.skipped_columns.is_empty()
            && self.conversion_errors.is_empty()
            && self.failed_updates.is_empty()
    }
}

/// Finds the record a key cell names
enum KeyLookup {
    /// The key cell is a record id
    RecordId,
    /// Records indexed by the trimmed display string of the key field
    ByValue(HashMap<String, Vec<RecordId>>),
}

impl KeyLookup {
    fn build<S: RecordStore + ?Sized>(catalog: &FieldCatalog, key_field: &FieldId, store: &S) -> Self {
        if key_field.as_str() == ID_FIELD {
            return KeyLookup::RecordId;
        }

        let mut index: HashMap<String, Vec<RecordId>> = HashMap::new();
        if let Some(descriptor) = catalog.get(key_field) {
            for id in store.record_ids() {
                let Some(metadata) = store.get_metadata(id) else {
                    continue;
                };
                let value = store.format_field(&metadata, descriptor);
                let value = value.trim();
                if !value.is_empty() {
                    index.entry(value.to_string()).or_default().push(id);
                }
            }
        }
        debug!(field = %key_field, keys = index.len(), "indexed records by key field");
        KeyLookup::ByValue(index)
    }

    fn find<S: RecordStore + ?Sized>(
        &self,
        key: &str,
        store: &S,
    ) -> std::result::Result<RecordId, RecordSkipReason> {
        match self {
            KeyLookup::RecordId => key
                .parse::<RecordId>()
                .ok()
                .filter(|id| store.get_metadata(*id).is_some())
                .ok_or(RecordSkipReason::NoMatch),
            KeyLookup::ByValue(index) => match index.get(key).map(Vec::as_slice) {
                Some([id]) => Ok(*id),
                Some(ids) if ids.len() > 1 => Err(RecordSkipReason::Ambiguous(ids.len())),
                _ => Err(RecordSkipReason::NoMatch),
            },
        }
    }
}

/// A column resolved to a writable field
struct TargetColumn<'c> {
    index: usize,
    name: &'c str,
    field: &'c FieldDescriptor,
}

/// Applies a CSV document to existing records
pub struct UpdateMergeTransform<'a> {
    catalog: &'a FieldCatalog,
    options: MergeOptions,
}

impl<'a> UpdateMergeTransform<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self::with_options(catalog, MergeOptions::default())
    }

    pub fn with_options(catalog: &'a FieldCatalog, options: MergeOptions) -> Self {
        Self { catalog, options }
    }

    /// Compute every record's update without writing anything
    ///
    /// Fails only when no column maps to the key field.
    pub fn plan<S: RecordStore + ?Sized>(&self, doc: &CsvDocument, store: &S) -> Result<MergePlan> {
        let mut plan = MergePlan::default();
        let (key_column, targets) = self.resolve_columns(doc, &mut plan.skipped_columns)?;
        let lookup = KeyLookup::build(self.catalog, &self.options.key_field, store);

        for (idx, cells) in doc.rows().iter().enumerate() {
            let row = idx + 1;
            let key = cells[key_column].trim();

            let record = match lookup.find(key, store) {
                Ok(record) => record,
                Err(reason) => {
                    warn!(row, key, %reason, "row key does not identify a record, skipping row");
                    plan.skipped_rows.push(UnknownRecordWarning {
                        row,
                        key: key.to_string(),
                        reason,
                    });
                    continue;
                }
            };

            let mut changes = FieldUpdate::new();
            for target in &targets {
                match merge_decision(&cells[target.index]) {
                    MergeDecision::NoOp => {}
                    MergeDecision::Delete => {
                        changes.insert(target.field.id.clone(), None);
                    }
                    MergeDecision::Set(text) => match target.field.data_type.convert(text) {
                        Ok(value) => {
                            changes.insert(target.field.id.clone(), Some(value));
                        }
                        Err(error) => {
                            warn!(row, record, column = target.name, %error, "cell conversion failed");
                            plan.conversion_errors.push(FieldConversionError {
                                row,
                                record,
                                column: target.name.to_string(),
                                field: target.field.id.clone(),
                                error,
                            });
                        }
                    },
                }
            }

            if changes.is_empty() {
                debug!(row, record, "row changes nothing");
                plan.unchanged_count += 1;
            } else {
                debug!(row, record, fields = changes.len(), "planned record update");
                plan.updates.push(RecordUpdate {
                    row,
                    record,
                    changes,
                });
            }
        }

        Ok(plan)
    }

    /// Write a plan's updates, one record at a time
    ///
    /// Earlier records stay committed when a later one fails.
    pub fn apply<S: RecordStore + ?Sized>(&self, plan: MergePlan, store: &mut S) -> MergeReport {
        let mut report = MergeReport {
            unchanged_count: plan.unchanged_count,
            skipped_rows: plan.skipped_rows,
            skipped_columns: plan.skipped_columns,
            conversion_errors: plan.conversion_errors,
            ..MergeReport::default()
        };

        for update in plan.updates {
            match store.set_fields(update.record, &update.changes) {
                Ok(()) => report.updated_count += 1,
                Err(e) => {
                    warn!(record = update.record, error = %e, "record update failed");
                    report.failed_updates.push(UpdateFailure {
                        row: update.row,
                        record: update.record,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            updated = report.updated_count,
            unchanged = report.unchanged_count,
            skipped_rows = report.skipped_rows.len(),
            skipped_columns = report.skipped_columns.len(),
            conversion_errors = report.conversion_errors.len(),
            failed = report.failed_updates.len(),
            "import finished"
        );
        report
    }

    /// Plan and apply in one step
    pub fn run<S: RecordStore + ?Sized>(&self, doc: &CsvDocument, store: &mut S) -> Result<MergeReport> {
        let plan = self.plan(doc, &*store)?;
        Ok(self.apply(plan, store))
    }

    /// Find the key column and the writable columns of a document
    fn resolve_columns<'c>(
        &'c self,
        doc: &'c CsvDocument,
        skipped: &mut Vec<UnknownColumnWarning>,
    ) -> Result<(usize, Vec<TargetColumn<'c>>)> {
        let mut key_column = None;
        let mut claimed: HashSet<&FieldId> = HashSet::new();
        let mut targets = Vec::new();

        for (index, name) in doc.header().iter().enumerate() {
            let Some(field) = self.catalog.resolve_header(name) else {
                skipped.push(column_warning(index, name, ColumnSkipReason::NoMatchingField));
                continue;
            };

            if field.id == self.options.key_field && key_column.is_none() {
                key_column = Some(index);
                claimed.insert(&field.id);
                continue;
            }

            if claimed.contains(&field.id) {
                let reason = ColumnSkipReason::DuplicateField(field.id.clone());
                skipped.push(column_warning(index, name, reason));
            } else if self.catalog.is_read_only(&field.id) {
                skipped.push(column_warning(index, name, ColumnSkipReason::ReadOnly));
            } else {
                debug!(column = index, field = %field.id, "mapped column");
                claimed.insert(&field.id);
                targets.push(TargetColumn {
                    index,
                    name: name.as_str(),
                    field,
                });
            }
        }

        let key_column = key_column.ok_or_else(|| Error::MissingKeyColumn {
            field: self.options.key_field.clone(),
        })?;
        Ok((key_column, targets))
    }
}

fn column_warning(column: usize, name: &str, reason: ColumnSkipReason) -> UnknownColumnWarning {
    warn!(column, name, %reason, "skipping column");
    UnknownColumnWarning {
        column,
        name: name.to_string(),
        reason,
    }
}
