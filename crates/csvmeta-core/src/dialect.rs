//! The fixed CSV dialect shared by export and import
//!
//! Every field is double-quoted, commas separate values, embedded quotes are
//! doubled and lines end with `\n`. Output is UTF-8 without a byte-order mark.
//! The dialect is not configurable so that an exported file always re-imports
//! byte for byte.

use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};

pub const DELIMITER: u8 = b',';
pub const QUOTE: u8 = b'"';
pub const LINE_TERMINATOR: u8 = b'\n';

/// UTF-8 byte-order mark, tolerated at the start of an input file
pub const UTF8_BOM: char = '\u{feff}';

/// Cell text meaning "delete the current value"
pub const NULL_SENTINEL: &str = "NULL";

/// Reader configured for the dialect
///
/// Headers are read as an ordinary record so the codec can validate them, and
/// rows of unequal width are rejected by the parser itself.
pub fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(false)
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .double_quote(true)
        .trim(Trim::None);
    builder
}

/// Writer configured for the dialect
pub fn writer_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .has_headers(false)
        .flexible(false)
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .double_quote(true)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(LINE_TERMINATOR));
    builder
}

/// Human-readable rules of the format, one entry per rule
pub const FORMAT_RULES: &[&str] = &[
    "The file must be saved as Unicode (UTF-8) text.",
    "Values are separated by a single comma (not tabs, not fixed width).",
    "At least two columns are required.",
    "At least two lines are required: a header and one or more data rows.",
    "The header row holds the unique, double-quoted name of each column.",
    "Every row after the header holds a value or an empty value in each column.",
    "Every row has exactly as many columns as the header.",
    "All values are double-quoted; a line never ends with a bare comma and never contains ',,'.",
    "A double-quote inside a value is written as two double-quotes (\"\").",
    "Leading and trailing spaces are removed from each value.",
    "An empty value leaves the field unchanged.",
    "The keyword NULL (upper case) deletes the field's value.",
];

/// The format rules as a bullet list
pub fn format_description() -> String {
    FORMAT_RULES
        .iter()
        .map(|rule| format!("- {}\n", rule))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_quotes_everything() {
        let mut writer = writer_builder().from_writer(Vec::new());
        writer.write_record(["a", "b\"c", ""]).unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "\"a\",\"b\"\"c\",\"\"\n");
    }

    #[test]
    fn test_description_mentions_sentinel() {
        let text = format_description();
        assert!(text.contains(NULL_SENTINEL));
        assert_eq!(text.lines().count(), FORMAT_RULES.len());
    }
}
