//! Field encoding for the delimited output.
//!
//! For a non-empty value, in order:
//! 1. trailing spaces are stripped when trimming is on
//! 2. the field is quoted when quoting is forced or the value holds the
//!    field delimiter
//! 3. a value made of `.` and digits only gets a leading `0`
//! 4. the value is written between the quotes as is
//!
//! Quotes inside a quoted value are not escaped. Downstream consumers rely
//! on the output being byte-identical to what this has always produced.

use crate::config::ExportConfig;
use crate::driver::{ColumnDescriptor, RowBuffer};

const QUOTE: u8 = b'"';

/// Writes fields, records and header rows for one export configuration
#[derive(Debug, Clone, Copy)]
pub struct FieldEncoder<'a> {
    config: &'a ExportConfig,
}

impl<'a> FieldEncoder<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Append the token for one value. NULL and empty values produce nothing.
    pub fn encode_into(&self, out: &mut Vec<u8>, raw: Option<&[u8]>) {
        let Some(mut value) = raw.filter(|v| !v.is_empty()) else {
            return;
        };

        if self.config.trim_strings {
            value = trim_trailing_spaces(value);
        }
        let delimiter = self.config.field_delimiter.as_bytes();
        let needs_quote = self.config.quote_strings || contains(value, delimiter);

        if needs_quote {
            out.push(QUOTE);
        }
        if is_bare_fraction(value) {
            out.push(b'0');
        }
        out.extend_from_slice(value);
        if needs_quote {
            out.push(QUOTE);
        }
    }

    /// Token for one value as an owned buffer
    pub fn encode(&self, raw: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out, raw);
        out
    }

    /// Append one record: the fields joined by the field delimiter, then the
    /// record delimiter
    pub fn encode_row(&self, out: &mut Vec<u8>, row: &RowBuffer) {
        for (i, field) in row.fields().iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(self.config.field_delimiter.as_bytes());
            }
            self.encode_into(out, field.value());
        }
        out.extend_from_slice(self.config.record_delimiter.as_bytes());
    }

    /// Append the header record. Names are quoted like values but never
    /// trimmed or rewritten.
    pub fn encode_header(&self, out: &mut Vec<u8>, columns: &[ColumnDescriptor]) {
        let delimiter = self.config.field_delimiter.as_bytes();
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(delimiter);
            }
            let name = column.name.as_bytes();
            let needs_quote = self.config.quote_strings || contains(name, delimiter);
            if needs_quote {
                out.push(QUOTE);
            }
            out.extend_from_slice(name);
            if needs_quote {
                out.push(QUOTE);
            }
        }
        out.extend_from_slice(self.config.record_delimiter.as_bytes());
    }
}

/// Strip trailing `' '` only, tabs and leading spaces stay
fn trim_trailing_spaces(value: &[u8]) -> &[u8] {
    let end = value
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |last| last + 1);
    &value[..end]
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// `.` followed by nothing but ASCII digits
fn is_bare_fraction(value: &[u8]) -> bool {
    value
        .split_first()
        .is_some_and(|(&first, rest)| first == b'.' && rest.iter().all(u8::is_ascii_digit))
}
