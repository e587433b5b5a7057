//! CSV codec for the metadata exchange format

use crate::dialect::{reader_builder, writer_builder, UTF8_BOM};
use crate::document::CsvDocument;
use crate::error::{Error, MalformedKind, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse a CSV file into a document
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<CsvDocument> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_bytes(&bytes)
}

/// Parse raw bytes, rejecting anything that is not UTF-8
pub fn parse_bytes(bytes: &[u8]) -> Result<CsvDocument> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::malformed(MalformedKind::Encoding, e.to_string()))?;
    parse(text)
}

/// Parse CSV text into a header and data rows
pub fn parse(text: &str) -> Result<CsvDocument> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(Error::malformed(MalformedKind::Empty, "the file is empty"));
    }

    let mut csv_reader = reader_builder().from_reader(text.as_bytes());

    let mut lines: Vec<Vec<String>> = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(malformed_from_csv)?;
        lines.push(record.iter().map(str::to_string).collect());
    }

    if lines.len() < 2 {
        return Err(Error::malformed(
            MalformedKind::TooFewLines,
            format!(
                "found {} line(s), a header and at least one data row are required",
                lines.len()
            ),
        ));
    }

    let header = lines.remove(0);
    debug!(
        columns = header.len(),
        rows = lines.len(),
        "parsed CSV document"
    );
    CsvDocument::new(header, lines)
}

fn malformed_from_csv(err: csv::Error) -> Error {
    let kind = match err.kind() {
        csv::ErrorKind::UnequalLengths { .. } => MalformedKind::FieldCount,
        csv::ErrorKind::Utf8 { .. } => MalformedKind::Encoding,
        _ => MalformedKind::Syntax,
    };
    Error::malformed(kind, err.to_string())
}

/// Serialize a header and rows, quoting every field
///
/// Rows must be as wide as the header; a mismatch is reported by the
/// underlying writer as an error.
pub fn serialize(header: &[String], rows: &[Vec<String>]) -> Result<String> {
    let mut writer = writer_builder().from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::malformed(MalformedKind::Encoding, e.to_string()))
}

/// Serialize a whole document
pub fn serialize_document(doc: &CsvDocument) -> Result<String> {
    serialize(doc.header(), doc.rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn kind_of(err: Error) -> MalformedKind {
        match err {
            Error::MalformedCsv { kind, .. } => kind,
            other => panic!("expected MalformedCsv, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_quoted_csv() {
        let doc = parse("\"id\",\"title\"\n\"1\",\"Foo\"\n\"2\",\"Say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(doc.header(), strings(&["id", "title"]).as_slice());
        assert_eq!(doc.row_count(), 2);
        assert_eq!(doc.cell(1, 1), Some("Say \"hi\""));
    }

    #[test]
    fn test_parse_keeps_whitespace_and_empty_cells() {
        let doc = parse("\"id\",\"title\"\n\"1\",\"  padded \"\n\"2\",\"\"\n").unwrap();
        assert_eq!(doc.cell(0, 1), Some("  padded "));
        assert_eq!(doc.cell(1, 1), Some(""));
    }

    #[test]
    fn test_parse_embedded_newline() {
        let doc = parse("\"id\",\"comments\"\n\"1\",\"line one\nline two\"\n").unwrap();
        assert_eq!(doc.row_count(), 1);
        assert_eq!(doc.cell(0, 1), Some("line one\nline two"));
    }

    #[test]
    fn test_parse_strips_bom() {
        let doc = parse("\u{feff}\"id\",\"title\"\n\"1\",\"Foo\"\n").unwrap();
        assert_eq!(doc.header()[0], "id");
    }

    #[test]
    fn test_short_row_is_fatal() {
        let err = parse("\"a\",\"b\",\"c\"\n\"1\",\"2\"\n").unwrap_err();
        assert_eq!(kind_of(err), MalformedKind::FieldCount);
    }

    #[test]
    fn test_long_row_is_fatal() {
        let err = parse("\"a\",\"b\"\n\"1\",\"2\"\n\"1\",\"2\",\"3\"\n").unwrap_err();
        assert_eq!(kind_of(err), MalformedKind::FieldCount);
    }

    #[test]
    fn test_single_line_is_fatal() {
        let err = parse("\"id\",\"title\"\n").unwrap_err();
        assert_eq!(kind_of(err), MalformedKind::TooFewLines);
    }

    #[test]
    fn test_empty_source_is_fatal() {
        assert_eq!(kind_of(parse("").unwrap_err()), MalformedKind::Empty);
        assert_eq!(kind_of(parse("\n\n").unwrap_err()), MalformedKind::Empty);
    }

    #[test]
    fn test_single_column_is_fatal() {
        let err = parse("\"id\"\n\"1\"\n").unwrap_err();
        assert_eq!(kind_of(err), MalformedKind::TooFewColumns);
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let err = parse_bytes(b"\"id\",\"title\"\n\"1\",\"\xff\"\n").unwrap_err();
        assert_eq!(kind_of(err), MalformedKind::Encoding);
    }

    #[test]
    fn test_serialize_quotes_every_field() {
        let text = serialize(
            &strings(&["id", "title"]),
            &[strings(&["1", "Foo"]), strings(&["2", ""])],
        )
        .unwrap();
        assert_eq!(text, "\"id\",\"title\"\n\"1\",\"Foo\"\n\"2\",\"\"\n");
    }

    #[test]
    fn test_round_trip() {
        let header = strings(&["id", "title", "comments"]);
        let rows = vec![
            strings(&["1", "A, \"quoted\" title", "multi\nline"]),
            strings(&["2", "", " spaced "]),
            strings(&["3", "NULL", "ünïcödé"]),
        ];
        let text = serialize(&header, &rows).unwrap();
        let doc = parse(&text).unwrap();
        assert_eq!(doc.into_parts(), (header, rows));
    }

    #[test]
    fn test_serialize_rejects_ragged_rows() {
        let result = serialize(&strings(&["a", "b"]), &[strings(&["1"])]);
        assert!(matches!(result, Err(Error::Csv(_))));
    }
}
