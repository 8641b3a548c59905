use std::path::PathBuf;

use smart_default::SmartDefault;

/// Longest delimiter accepted, in bytes after unescaping
pub const MAX_DELIMITER_LEN: usize = 7;

/// Run-wide export settings, fixed once the command line is parsed
#[derive(Debug, Clone, SmartDefault)]
pub struct ExportConfig {
    /// Written between fields of a record
    #[default("\t".to_string())]
    pub field_delimiter: String,

    /// Written after the last field of every record
    #[default("\n".to_string())]
    pub record_delimiter: String,

    /// Quote every non-empty field, not only the ones holding the delimiter
    pub quote_strings: bool,

    /// Strip trailing spaces from values
    #[default(true)]
    pub trim_strings: bool,

    /// Emit a header row with the column names
    pub column_names: bool,

    pub verbose: bool,

    /// Output file of the first resultset, later ones are numbered from it
    pub output_path: PathBuf,

    pub catalog: CatalogKind,
}

/// Catalog used to classify a bare object reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CatalogKind {
    /// `information_schema` tables and routines
    #[default]
    Mysql,
    /// `sysobjects` joined with `sysusers`
    Sysobjects,
}

/// Turn the `\t`, `\n`, `\r` and `\\` escapes of a delimiter option into the
/// characters they stand for
pub fn parse_delimiter(raw: &str) -> Result<String, String> {
    let mut delimiter = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            delimiter.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => delimiter.push('\t'),
            Some('n') => delimiter.push('\n'),
            Some('r') => delimiter.push('\r'),
            Some('\\') => delimiter.push('\\'),
            Some(other) => {
                delimiter.push('\\');
                delimiter.push(other);
            }
            None => delimiter.push('\\'),
        }
    }

    if delimiter.len() > MAX_DELIMITER_LEN {
        return Err(format!("delimiter '{raw}' is over {MAX_DELIMITER_LEN} bytes"));
    }
    Ok(delimiter)
}

/// Like [`parse_delimiter`], rejecting an empty result
pub fn parse_field_delimiter(raw: &str) -> Result<String, String> {
    let delimiter = parse_delimiter(raw)?;
    if delimiter.is_empty() {
        return Err("field delimiter cannot be empty".to_string());
    }
    Ok(delimiter)
}

/// Read a boolean option word. `off`, `false`, `no` and `0` mean false in
/// any case, every other word means true.
pub fn parse_bool_word(raw: &str) -> Result<bool, String> {
    let word = raw.trim();
    let off = ["off", "false", "no", "0"]
        .iter()
        .any(|w| word.eq_ignore_ascii_case(w));
    Ok(!off)
}
