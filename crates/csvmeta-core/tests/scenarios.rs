//! End-to-end export and import scenarios

use csvmeta_core::{
    parse, serialize_document, DataType, ExportTransform, FieldCatalog, FieldId, FieldMap, FieldValue, MemoryStore,
    RecordStore, UpdateMergeTransform,
};

fn text(s: &str) -> FieldValue {
    FieldValue::Text(s.to_string())
}

/// Fields registered without labels, so headers are the raw field ids
fn plain_store() -> MemoryStore {
    MemoryStore::new("Library")
        .with_field("id", "", DataType::Integer)
        .with_field("title", "", DataType::Text)
        .with_field(
            "authors",
            "",
            DataType::MultiValue {
                separator: "&".to_string(),
            },
        )
        .with_field("#pages", "", DataType::Integer)
}

fn record(title: &str) -> FieldMap {
    let mut values = FieldMap::new();
    values.insert(FieldId::new("title"), text(title));
    values
}

#[test]
fn export_single_record() {
    let mut store = plain_store();
    let mut values = record("Foo");
    values.insert(FieldId::new("authors"), FieldValue::List(vec!["A".to_string()]));
    store.insert_record(1, values);

    let catalog = FieldCatalog::from_store(&store);
    let csv = ExportTransform::new(&store, &catalog)
        .export_csv(&[1], &[FieldId::new("id"), FieldId::new("title")])
        .unwrap();

    assert_eq!(csv, "\"id\",\"title\"\n\"1\",\"Foo\"\n");
}

#[test]
fn export_counts_only_known_records() {
    let mut store = plain_store();
    store.insert_record(1, record("Foo"));
    store.insert_record(2, record("Bar"));

    let catalog = FieldCatalog::from_store(&store);
    let doc = ExportTransform::new(&store, &catalog)
        .build_rows(&[1, 2, 99, 100], &[FieldId::new("id"), FieldId::new("title")])
        .unwrap();

    assert_eq!(doc.row_count(), 2);
    let csv = serialize_document(&doc).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn import_sets_and_deletes() {
    let mut store = plain_store();
    store.insert_record(1, record("Old One"));
    store.insert_record(2, record("Old Two"));
    let catalog = FieldCatalog::from_store(&store);

    let doc = parse("\"id\",\"title\"\n\"1\",\"NULL\"\n\"2\",\"New Title\"\n").unwrap();
    let report = UpdateMergeTransform::new(&catalog)
        .run(&doc, &mut store)
        .unwrap();

    assert_eq!(report.updated_count, 2);
    assert!(report.is_clean());
    assert_eq!(store.value(1, "title"), None);
    assert_eq!(store.value(2, "title"), Some(&text("New Title")));
}

#[test]
fn import_reports_unknown_record() {
    let mut store = plain_store();
    store.insert_record(1, record("Old One"));
    let catalog = FieldCatalog::from_store(&store);

    let doc = parse("\"id\",\"title\"\n\"1\",\"NULL\"\n\"2\",\"New Title\"\n").unwrap();
    let report = UpdateMergeTransform::new(&catalog)
        .run(&doc, &mut store)
        .unwrap();

    assert_eq!(report.updated_count, 1);
    assert_eq!(report.skipped_rows.len(), 1);
    assert_eq!(report.skipped_rows[0].key, "2");
    assert_eq!(store.value(1, "title"), None);
    assert!(store.get_metadata(2).is_none());
}

#[test]
fn conversion_failure_is_isolated() {
    let mut store = plain_store();
    store.insert_record(1, record("Old One"));
    let catalog = FieldCatalog::from_store(&store);

    let doc = parse("\"id\",\"#pages\",\"title\"\n\"1\",\"abc\",\"ok\"\n").unwrap();
    let report = UpdateMergeTransform::new(&catalog)
        .run(&doc, &mut store)
        .unwrap();

    assert_eq!(report.updated_count, 1);
    assert_eq!(report.conversion_errors.len(), 1);
    let error = &report.conversion_errors[0];
    assert_eq!((error.row, error.record), (1, 1));
    assert_eq!(error.field.as_str(), "#pages");
    assert_eq!(store.value(1, "title"), Some(&text("ok")));
    assert_eq!(store.value(1, "#pages"), None);
}

#[test]
fn export_then_import_keeps_values() {
    let mut store = MemoryStore::with_standard_fields("Books");
    let mut values = record("A \"quoted\", title");
    values.insert(
        FieldId::new("authors"),
        FieldValue::List(vec!["Jane Doe".to_string(), "John Roe".to_string()]),
    );
    values.insert(FieldId::new("series"), text("Saga"));
    values.insert(FieldId::new("series_index"), FieldValue::Float(2.5));
    values.insert(
        FieldId::new("tags"),
        FieldValue::List(vec!["fantasy".to_string(), "epic".to_string()]),
    );
    store.insert_record(7, values);
    let before = store.clone();

    let catalog = FieldCatalog::from_store(&store);
    let fields: Vec<FieldId> = ["id", "title", "authors", "series", "series_index", "tags", "isbn"]
        .iter()
        .map(|f| FieldId::new(*f))
        .collect();
    let csv = ExportTransform::new(&store, &catalog)
        .export_csv(&[7], &fields)
        .unwrap();

    let doc = parse(&csv).unwrap();
    let report = UpdateMergeTransform::new(&catalog)
        .run(&doc, &mut store)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(store, before);
}
