//! The database driver seam.
//!
//! The exporter only ever talks to a database through [`Driver`]: execute one
//! statement, walk its resultsets, describe columns, fetch rows into a reused
//! [`RowBuffer`], and drain stacked diagnostics. [`mysql::MysqlDriver`] is the
//! wire implementation shipped with the crate.

pub mod mysql;

use auto_impl::auto_impl;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::protocol::response::ErrPayload;

/// Longest column name kept, in bytes
pub const MAX_COLUMN_NAME_LEN: usize = 128;

/// Upper bound for the capacity reserved per column before the first fetch.
/// Buffers still grow past it when a value needs more room.
const MAX_INITIAL_FIELD_CAPACITY: usize = 64 * 1024;

/// Metadata for one column of a resultset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// 1-based position in the resultset
    pub ordinal: usize,
    /// Type code as reported by the driver
    pub type_code: u8,
    /// Declared display size, never below 1
    pub size: usize,
    pub decimal_digits: u8,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: &str, ordinal: usize, type_code: u8, size: usize) -> Self {
        Self {
            name: truncate_name(name).to_string(),
            ordinal,
            type_code,
            size: size.max(1),
            decimal_digits: 0,
            nullable: true,
        }
    }

    /// Bytes reserved for this column's fetch buffer: twice the declared
    /// size, for drivers that report sizes in characters of a narrower
    /// encoding than they deliver.
    pub fn buffer_capacity(&self) -> usize {
        let doubled = self.size.saturating_mul(2);
        doubled.min(MAX_INITIAL_FIELD_CAPACITY)
    }
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_COLUMN_NAME_LEN {
        return name;
    }
    let mut end = MAX_COLUMN_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// One fetched value slot
#[derive(Debug, Clone, Default)]
pub struct Field {
    data: Vec<u8>,
    null: bool,
}

impl Field {
    /// The value, or `None` for SQL NULL
    pub fn value(&self) -> Option<&[u8]> {
        if self.null { None } else { Some(&self.data) }
    }

    pub fn set_null(&mut self) {
        self.data.clear();
        self.null = true;
    }

    pub fn set(&mut self, value: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(value);
        self.null = false;
    }
}

/// Per-resultset fetch buffers, one [`Field`] per column.
///
/// The driver overwrites the fields in place on every fetch, so what a caller
/// reads is only valid until the next call to [`Driver::fetch_row`].
#[derive(Debug, Clone, Default)]
pub struct RowBuffer {
    fields: Vec<Field>,
}

impl RowBuffer {
    pub fn for_columns(columns: &[ColumnDescriptor]) -> Self {
        let fields = columns
            .iter()
            .map(|col| Field {
                data: Vec::with_capacity(col.buffer_capacity()),
                null: true,
            })
            .collect();
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }
}

/// Outcome of a fetch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// The row buffer holds the next row
    Row,
    /// The current resultset has no more rows
    NoData,
}

/// One diagnostic record reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub sql_state: String,
    pub native_error: u32,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[SQLSTATE={}] {}", self.sql_state, self.message)
    }
}

impl From<&ErrPayload> for Diagnostic {
    fn from(payload: &ErrPayload) -> Self {
        Self {
            sql_state: payload.sql_state.clone(),
            native_error: u32::from(payload.error_code),
            message: payload.message.clone(),
        }
    }
}

/// How loudly stacked diagnostics are logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call failed and the run is aborted
    Critical,
    /// The call failed but processing continues
    Warning,
    /// The call succeeded with information attached, only shown in verbose mode
    Info,
}

/// Log every diagnostic record the driver holds, oldest first
pub fn report_diagnostics<D: Driver + ?Sized>(driver: &mut D, severity: Severity) {
    for diagnostic in driver.take_diagnostics() {
        match severity {
            Severity::Critical => error!("{diagnostic}"),
            Severity::Warning => warn!("{diagnostic}"),
            Severity::Info => debug!("{diagnostic}"),
        }
    }
}

/// A connected database driver positioned on at most one statement.
///
/// After [`execute`](Driver::execute) the driver is positioned on the first
/// resultset of the statement. A resultset whose
/// [`column_count`](Driver::column_count) is zero is informational (for
/// example an affected-rows notice) and carries no rows.
#[auto_impl(&mut, Box)]
pub trait Driver {
    /// Run `sql`, replacing any statement still open
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Number of columns of the current resultset
    fn column_count(&mut self) -> Result<usize>;

    /// Describe column `index` (0-based) of the current resultset
    fn describe_column(&mut self, index: usize) -> Result<ColumnDescriptor>;

    /// Fetch the next row of the current resultset into `row`
    fn fetch_row(&mut self, row: &mut RowBuffer) -> Result<Fetch>;

    /// Move to the next resultset, discarding unread rows.
    /// Returns `false` when the statement has no more resultsets.
    fn more_results(&mut self) -> Result<bool>;

    /// Rows affected by the current informational resultset, if known
    fn affected_rows(&self) -> Option<u64>;

    /// Drain the diagnostic records collected since the last call, oldest first
    fn take_diagnostics(&mut self) -> Vec<Diagnostic>;

    /// Discard whatever is left of the current statement
    fn close_cursor(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;
}
