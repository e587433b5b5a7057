//! csvmeta-core: Core library for exchanging book metadata through CSV
//!
//! This library provides functionality to:
//! - Parse and write the strict CSV exchange dialect
//! - Resolve library fields to display names and back
//! - Keep an ordered, persisted selection of fields to export
//! - Export records as CSV rows
//! - Merge an imported CSV document into existing records

pub mod catalog;
pub mod codec;
pub mod dialect;
pub mod document;
pub mod error;
pub mod export;
pub mod field;
pub mod merge;
pub mod prefs;
pub mod selection;
pub mod store;

pub use catalog::FieldCatalog;
pub use codec::{parse, parse_bytes, parse_file, serialize, serialize_document};
pub use dialect::format_description;
pub use document::CsvDocument;
pub use error::{Error, MalformedKind, Result};
pub use export::ExportTransform;
pub use field::{DataType, FieldDescriptor, FieldId, FieldSource, FieldValue};
pub use merge::{
    merge_decision, FieldConversionError, MergeDecision, MergeOptions, MergePlan, MergeReport,
    RecordSkipReason, UnknownColumnWarning, UnknownRecordWarning, UpdateMergeTransform,
};
pub use prefs::{JsonPrefs, MemoryPrefs, PreferenceStore};
pub use selection::FieldSelection;
pub use store::{FieldMap, FieldUpdate, MemoryStore, RecordId, RecordStore, SelectionSource};
