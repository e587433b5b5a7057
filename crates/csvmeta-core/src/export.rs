//! Projection of library records into a CSV document

use crate::catalog::FieldCatalog;
use crate::codec::serialize_document;
use crate::document::CsvDocument;
use crate::error::Result;
use crate::field::{FieldDescriptor, FieldId, FieldSource};
use crate::store::{RecordId, RecordStore};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Builds export rows from a record store; never mutates a record
pub struct ExportTransform<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    catalog: &'a FieldCatalog,
}

impl<'a, S: RecordStore + ?Sized> ExportTransform<'a, S> {
    pub fn new(store: &'a S, catalog: &'a FieldCatalog) -> Self {
        Self { store, catalog }
    }

    /// One row per known record, one column per known field
    ///
    /// Unknown fields are dropped. Records the store does not hold are
    /// skipped with a warning.
    pub fn build_rows(&self, record_ids: &[RecordId], fields: &[FieldId]) -> Result<CsvDocument> {
        let columns: Vec<&FieldDescriptor> = fields
            .iter()
            .filter_map(|f| {
                let descriptor = self.catalog.get(f);
                if descriptor.is_none() {
                    debug!(field = %f, "dropping unknown field from export");
                }
                descriptor
            })
            .collect();

        let (columns, header) = export_columns(columns);
        let library_name = self.store.library_name();

        let mut rows = Vec::with_capacity(record_ids.len());
        for &id in record_ids {
            let Some(metadata) = self.store.get_metadata(id) else {
                warn!(record = id, "record not found, skipping from export");
                continue;
            };

            let row: Vec<String> = columns
                .iter()
                .map(|field| match field.source {
                    FieldSource::LibraryName => library_name.clone(),
                    _ => self.store.format_field(&metadata, field),
                })
                .collect();
            rows.push(row);
        }

        debug!(rows = rows.len(), columns = header.len(), "built export rows");
        CsvDocument::new(header, rows)
    }

    /// Build the rows and serialize them in one step
    ///
    /// Either the complete text is returned or an error, so a caller that
    /// writes the result never leaves a partial file.
    pub fn export_csv(&self, record_ids: &[RecordId], fields: &[FieldId]) -> Result<String> {
        let doc = self.build_rows(record_ids, fields)?;
        serialize_document(&doc)
    }
}

/// Pair each column with a unique header
///
/// Display names are used first; a name already taken falls back to the
/// field id. A column whose id is taken as well is dropped.
fn export_columns(columns: Vec<&FieldDescriptor>) -> (Vec<&FieldDescriptor>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(columns.len());
    let mut header = Vec::with_capacity(columns.len());

    for field in columns {
        let name = if seen.insert(field.display_name.clone()) {
            field.display_name.clone()
        } else if seen.insert(field.id.to_string()) {
            field.id.to_string()
        } else {
            warn!(field = %field.id, "no unique header for field, dropping it from export");
            continue;
        };
        kept.push(field);
        header.push(name);
    }

    (kept, header)
}
