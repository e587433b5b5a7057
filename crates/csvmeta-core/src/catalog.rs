//! Catalog of the fields that can be exchanged through CSV

use crate::field::{DataType, FieldDescriptor, FieldId, FieldSource};
use crate::store::RecordStore;
use std::collections::BTreeMap;
use tracing::debug;

/// Fields that cannot be represented as CSV text: the aggregate of all
/// fields, the device-presence flag and the cover image
pub const BLOCKED_FIELDS: &[&str] = &["all", "ondevice", "cover"];

/// Record key field
pub const ID_FIELD: &str = "id";

pub const ISBN_FIELD: &str = "isbn";
pub const ISBN_LABEL: &str = "ISBN";

/// Pseudo field carrying the library's name
pub const LIBRARY_NAME_FIELD: &str = "library_name";
pub const LIBRARY_NAME_LABEL: &str = "Library Name";

/// Appended to a series label to name its position companion
pub const COMPANION_LABEL_SUFFIX: &str = " Number";

/// Every exportable field of a store, resolved once
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: BTreeMap<FieldId, FieldDescriptor>,
}

impl FieldCatalog {
    /// Resolve every built-in and custom field of a store
    pub fn from_store<S: RecordStore + ?Sized>(store: &S) -> Self {
        let mut fields = BTreeMap::new();

        let keys = store
            .builtin_field_keys()
            .into_iter()
            .chain(store.custom_field_keys());

        for id in keys {
            if BLOCKED_FIELDS.contains(&id.as_str()) || id.as_str() == LIBRARY_NAME_FIELD {
                continue;
            }
            let metadata = store.field_metadata(&id);
            let data_type = metadata
                .as_ref()
                .map(|m| m.data_type.clone())
                .unwrap_or(DataType::Text);
            let label = metadata.map(|m| m.name).unwrap_or_default();
            let source = if id.is_custom() {
                FieldSource::Custom
            } else {
                FieldSource::BuiltIn
            };

            fields.insert(
                id.clone(),
                FieldDescriptor {
                    display_name: base_label(&id, &label),
                    has_index_companion: data_type.is_series(),
                    data_type,
                    source,
                    id,
                },
            );
        }

        // Companions replace any registered `_index` field of the same id
        let companions: Vec<FieldDescriptor> = fields
            .values()
            .filter(|f| f.has_index_companion)
            .map(|parent| FieldDescriptor {
                id: parent.id.index_companion(),
                display_name: format!("{}{}", parent.display_name, COMPANION_LABEL_SUFFIX),
                data_type: DataType::SeriesIndex,
                source: FieldSource::IndexCompanion {
                    parent: parent.id.clone(),
                },
                has_index_companion: false,
            })
            .collect();
        for companion in companions {
            fields.insert(companion.id.clone(), companion);
        }

        let library_name = FieldId::new(LIBRARY_NAME_FIELD);
        fields.insert(
            library_name.clone(),
            FieldDescriptor {
                id: library_name,
                display_name: LIBRARY_NAME_LABEL.to_string(),
                data_type: DataType::Text,
                source: FieldSource::LibraryName,
                has_index_companion: false,
            },
        );

        debug!(fields = fields.len(), "built field catalog");
        Self { fields }
    }

    /// All fields, in field id order
    pub fn list_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &FieldId) -> Option<&FieldDescriptor> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &FieldId) -> bool {
        self.fields.contains_key(field)
    }

    /// Human label of a field, the raw id for unknown fields
    pub fn display_name(&self, field: &FieldId) -> String {
        self.fields
            .get(field)
            .map(|f| f.display_name.clone())
            .unwrap_or_else(|| field.to_string())
    }

    /// The `_index` companion of a series field
    pub fn resolve_companion(&self, field: &FieldId) -> Option<FieldId> {
        self.fields
            .get(field)
            .filter(|f| f.data_type.is_series())
            .map(|f| f.id.index_companion())
    }

    /// Map a CSV header name back to a field
    ///
    /// Display names are matched first. When several fields share a name,
    /// built-in fields win over companions, companions over custom fields,
    /// and the smallest field id breaks any remaining tie. A header that
    /// matches no display name may still name a field id directly.
    pub fn resolve_header(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .values()
            .filter(|f| f.display_name == name)
            .min_by(|a, b| {
                a.source
                    .precedence()
                    .cmp(&b.source.precedence())
                    .then_with(|| a.id.cmp(&b.id))
            })
            .or_else(|| self.fields.get(&FieldId::new(name)))
    }

    /// Fields whose values are never written on import
    pub fn is_read_only(&self, field: &FieldId) -> bool {
        field.as_str() == ID_FIELD
            || self
                .fields
                .get(field)
                .is_some_and(|f| f.source == FieldSource::LibraryName)
    }
}

fn base_label(id: &FieldId, registered: &str) -> String {
    if id.as_str() == ISBN_FIELD {
        ISBN_LABEL.to_string()
    } else if registered.is_empty() {
        id.to_string()
    } else {
        registered.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn catalog() -> FieldCatalog {
        let store = MemoryStore::with_standard_fields("Books")
            .with_field("#myseries", "Saga", DataType::Series)
            .with_field("#title", "Title", DataType::Text)
            .with_field("#nolabel", "", DataType::Integer)
            .with_field("all", "All", DataType::Text);
        FieldCatalog::from_store(&store)
    }

    #[test]
    fn test_blocked_fields_are_excluded() {
        let catalog = catalog();
        for blocked in BLOCKED_FIELDS {
            assert!(!catalog.contains(&FieldId::new(*blocked)));
        }
        assert!(catalog.contains(&FieldId::new("title")));
        assert!(catalog.contains(&FieldId::new("#myseries")));
    }

    #[test]
    fn test_display_names() {
        let catalog = catalog();
        assert_eq!(catalog.display_name(&FieldId::new("isbn")), "ISBN");
        assert_eq!(catalog.display_name(&FieldId::new("title")), "Title");
        assert_eq!(catalog.display_name(&FieldId::new("library_name")), "Library Name");
        assert_eq!(catalog.display_name(&FieldId::new("#nolabel")), "#nolabel");
        assert_eq!(catalog.display_name(&FieldId::new("nope")), "nope");
    }

    #[test]
    fn test_series_companions() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve_companion(&FieldId::new("series")),
            Some(FieldId::new("series_index"))
        );
        assert_eq!(catalog.resolve_companion(&FieldId::new("title")), None);
        assert_eq!(catalog.display_name(&FieldId::new("series_index")), "Series Number");
        assert_eq!(catalog.display_name(&FieldId::new("#myseries_index")), "Saga Number");

        let companion = catalog.get(&FieldId::new("#myseries_index")).unwrap();
        assert_eq!(companion.data_type, DataType::SeriesIndex);
        assert_eq!(
            companion.source,
            FieldSource::IndexCompanion {
                parent: FieldId::new("#myseries")
            }
        );
    }

    #[test]
    fn test_resolve_header_prefers_builtin() {
        let catalog = catalog();
        let field = catalog.resolve_header("Title").unwrap();
        assert_eq!(field.id.as_str(), "title");
    }

    #[test]
    fn test_resolve_header_falls_back_to_id() {
        let catalog = catalog();
        assert_eq!(catalog.resolve_header("title").unwrap().id.as_str(), "title");
        assert_eq!(catalog.resolve_header("#title").unwrap().id.as_str(), "#title");
        assert!(catalog.resolve_header("Unknown Column").is_none());
    }

    #[test]
    fn test_read_only_fields() {
        let catalog = catalog();
        assert!(catalog.is_read_only(&FieldId::new("id")));
        assert!(catalog.is_read_only(&FieldId::new("library_name")));
        assert!(!catalog.is_read_only(&FieldId::new("title")));
    }
}
