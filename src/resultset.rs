//! Walks the resultsets of one executed statement.
//!
//! Drivers may report zero-column resultsets (affected-row notices and the
//! like) between the real ones. Those are skipped here so callers only ever
//! see resultsets with columns.

use tracing::{debug, warn};

use crate::driver::{ColumnDescriptor, Driver, Fetch, RowBuffer, Severity, report_diagnostics};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// The driver is positioned on a resultset not yet inspected
    AwaitingColumns,
    /// A resultset was handed out
    HasColumns,
    Exhausted,
}

/// Iterator over the resultsets of the statement the driver just executed
pub struct ResultsetIterator<D: Driver> {
    driver: D,
    state: State,
    columns: Vec<ColumnDescriptor>,
    row: RowBuffer,
    rows_done: bool,
    count: usize,
}

impl<D: Driver> ResultsetIterator<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: State::AwaitingColumns,
            columns: Vec::new(),
            row: RowBuffer::default(),
            rows_done: true,
            count: 0,
        }
    }

    /// Move to the next resultset that has columns. `Ok(None)` once the
    /// statement has nothing more; every later call returns `Ok(None)` too.
    pub fn advance(&mut self) -> Result<Option<Resultset<'_, D>>> {
        let result = self.next_state();
        if result.is_err() {
            report_diagnostics(&mut self.driver, Severity::Critical);
            self.state = State::Exhausted;
        }
        if result? {
            Ok(Some(Resultset { iter: self }))
        } else {
            Ok(None)
        }
    }

    /// Returns true when positioned on a new resultset with columns
    fn next_state(&mut self) -> Result<bool> {
        loop {
            match self.state {
                State::Exhausted => return Ok(false),
                State::HasColumns => {
                    self.release_buffers();
                    self.step_driver()?;
                }
                State::AwaitingColumns => {
                    let column_count = self.driver.column_count()?;
                    if column_count == 0 {
                        if let Some(affected) = self.driver.affected_rows() {
                            debug!("{affected} rows affected");
                        }
                        report_diagnostics(&mut self.driver, Severity::Info);
                        self.step_driver()?;
                        continue;
                    }

                    debug!("Query returned {column_count} columns");
                    self.columns = (0..column_count)
                        .map(|i| self.driver.describe_column(i))
                        .collect::<Result<_>>()?;
                    self.row = RowBuffer::for_columns(&self.columns);
                    self.rows_done = false;
                    self.count += 1;
                    self.state = State::HasColumns;
                    return Ok(true);
                }
            }
        }
    }

    fn step_driver(&mut self) -> Result<()> {
        self.state = if self.driver.more_results()? {
            State::AwaitingColumns
        } else {
            State::Exhausted
        };
        Ok(())
    }

    fn release_buffers(&mut self) {
        self.columns = Vec::new();
        self.row = RowBuffer::default();
        self.rows_done = true;
    }
}

/// The resultset the iterator is positioned on. Rows are read through
/// [`next_row`](Resultset::next_row) and are only valid until the next call.
pub struct Resultset<'a, D: Driver> {
    iter: &'a mut ResultsetIterator<D>,
}

impl<D: Driver> Resultset<'_, D> {
    /// 1-based position among the resultsets with columns
    pub fn index(&self) -> usize {
        self.iter.count
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.iter.columns
    }

    /// Fetch the next row. A failed fetch is logged as a warning and ends the
    /// resultset; rows already read stay valid output.
    pub fn next_row(&mut self) -> Option<&RowBuffer> {
        let iter = &mut *self.iter;
        if iter.rows_done {
            return None;
        }
        match iter.driver.fetch_row(&mut iter.row) {
            Ok(Fetch::Row) => return Some(&iter.row),
            Ok(Fetch::NoData) => report_diagnostics(&mut iter.driver, Severity::Warning),
            Err(e) => {
                if !e.is_logged() {
                    warn!("{e}");
                }
                report_diagnostics(&mut iter.driver, Severity::Warning);
            }
        }
        iter.rows_done = true;
        None
    }
}
