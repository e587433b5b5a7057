//! Record store collaborator and a JSON-backed in-memory implementation

use crate::error::{Error, Result};
use crate::field::{DataType, FieldDescriptor, FieldId, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Identifier of a library record
pub type RecordId = i64;

/// Current values of a record, keyed by field
pub type FieldMap = BTreeMap<FieldId, FieldValue>;

/// Changes for one record: `Some` sets a value, `None` deletes it
pub type FieldUpdate = BTreeMap<FieldId, Option<FieldValue>>;

/// Label and type registered for a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub data_type: DataType,
}

impl FieldMetadata {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// System of record for library metadata
pub trait RecordStore {
    /// Current values of a record, `None` if the record does not exist
    fn get_metadata(&self, id: RecordId) -> Option<FieldMap>;

    /// Every record the store holds
    fn record_ids(&self) -> Vec<RecordId>;

    /// Apply every change of one record together
    fn set_fields(&mut self, id: RecordId, update: &FieldUpdate) -> Result<()>;

    /// Identifiers of the fields the store defines itself
    fn builtin_field_keys(&self) -> Vec<FieldId>;

    /// Identifiers of the user-defined fields
    fn custom_field_keys(&self) -> Vec<FieldId>;

    fn field_metadata(&self, field: &FieldId) -> Option<FieldMetadata>;

    fn library_name(&self) -> String;

    /// Display string of one field of a record; unset values format to `""`
    fn format_field(&self, metadata: &FieldMap, field: &FieldDescriptor) -> String {
        metadata
            .get(&field.id)
            .map(|value| value.format(&field.data_type))
            .unwrap_or_default()
    }
}

/// Source of the records a user picked
pub trait SelectionSource {
    fn selected_record_ids(&self) -> Vec<RecordId>;
}

impl SelectionSource for [RecordId] {
    fn selected_record_ids(&self) -> Vec<RecordId> {
        self.to_vec()
    }
}

/// Record store held in memory and persisted as a JSON library file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    pub library_name: String,
    /// Field registry
    #[serde(default)]
    pub fields: BTreeMap<FieldId, FieldMetadata>,
    #[serde(default)]
    pub records: BTreeMap<RecordId, FieldMap>,
}

impl MemoryStore {
    /// Create an empty store with no registered fields
    pub fn new(library_name: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            ..Self::default()
        }
    }

    /// Create an empty store with the usual book fields registered
    pub fn with_standard_fields(library_name: impl Into<String>) -> Self {
        let ampersand = DataType::MultiValue {
            separator: "&".to_string(),
        };
        let comma = DataType::MultiValue {
            separator: ",".to_string(),
        };
        Self::new(library_name)
            .with_field("id", "ID", DataType::Integer)
            .with_field("title", "Title", DataType::Text)
            .with_field("authors", "Authors", ampersand)
            .with_field("series", "Series", DataType::Series)
            .with_field("tags", "Tags", comma.clone())
            .with_field("publisher", "Publisher", DataType::Text)
            .with_field("pubdate", "Published", DataType::Date)
            .with_field("timestamp", "Date", DataType::Date)
            .with_field("rating", "Rating", DataType::Integer)
            .with_field("isbn", "Isbn", DataType::Text)
            .with_field("languages", "Languages", comma)
            .with_field("comments", "Comments", DataType::Comments)
            .with_field("cover", "Cover", DataType::Text)
            .with_field("ondevice", "On Device", DataType::Text)
    }

    /// Register a field
    pub fn with_field(
        mut self,
        id: impl Into<FieldId>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        self.fields
            .insert(id.into(), FieldMetadata::new(name, data_type));
        self
    }

    /// Insert or replace a record
    pub fn insert_record(&mut self, id: RecordId, values: FieldMap) {
        self.records.insert(id, values);
    }

    /// Get a single stored value
    pub fn value(&self, id: RecordId, field: &str) -> Option<&FieldValue> {
        self.records
            .get(&id)
            .and_then(|values| values.get(&FieldId::new(field)))
    }

    /// Load a library file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the library file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn get_metadata(&self, id: RecordId) -> Option<FieldMap> {
        let mut values = self.records.get(&id)?.clone();
        values.insert(FieldId::new("id"), FieldValue::Integer(id));
        Some(values)
    }

    fn record_ids(&self) -> Vec<RecordId> {
        self.records.keys().copied().collect()
    }

    fn set_fields(&mut self, id: RecordId, update: &FieldUpdate) -> Result<()> {
        let values = self.records.get_mut(&id).ok_or_else(|| Error::Store {
            record: id,
            message: "record does not exist".to_string(),
        })?;

        for (field, change) in update {
            match change {
                Some(value) => {
                    values.insert(field.clone(), value.clone());
                }
                None => {
                    values.remove(field);
                }
            }
        }
        Ok(())
    }

    fn builtin_field_keys(&self) -> Vec<FieldId> {
        self.fields.keys().filter(|f| !f.is_custom()).cloned().collect()
    }

    fn custom_field_keys(&self) -> Vec<FieldId> {
        self.fields.keys().filter(|f| f.is_custom()).cloned().collect()
    }

    fn field_metadata(&self, field: &FieldId) -> Option<FieldMetadata> {
        self.fields.get(field).cloned()
    }

    fn library_name(&self) -> String {
        self.library_name.clone()
    }
}

impl SelectionSource for MemoryStore {
    /// Every record, in id order
    fn selected_record_ids(&self) -> Vec<RecordId> {
        self.record_ids()
    }
}
