//! In-memory driver replaying canned responses per statement

#![allow(dead_code)]

use export2csv::driver::{ColumnDescriptor, Diagnostic, Driver, Fetch, RowBuffer};
use export2csv::error::{Error, Result};
use export2csv::protocol::response::ErrPayload;

/// One resultset of a scripted response
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Zero-column resultset carrying an affected-row count
    Info(u64),
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
        /// Fetch fails after this many rows
        fail_after: Option<usize>,
    },
}

pub fn info(affected: u64) -> Scripted {
    Scripted::Info(affected)
}

fn owned(row: &[Option<&str>]) -> Vec<Option<String>> {
    row.iter().map(|v| v.map(ToString::to_string)).collect()
}

pub fn rows(columns: &[&str], rows: &[&[Option<&str>]]) -> Scripted {
    Scripted::Rows {
        columns: columns.iter().map(ToString::to_string).collect(),
        rows: rows.iter().map(|row| owned(row)).collect(),
        fail_after: None,
    }
}

pub fn failing_after(scripted: Scripted, count: usize) -> Scripted {
    match scripted {
        Scripted::Rows { columns, rows, .. } => Scripted::Rows {
            columns,
            rows,
            fail_after: Some(count),
        },
        info @ Scripted::Info(_) => info,
    }
}

enum Response {
    Results(Vec<Scripted>),
    Fails(ErrPayload),
}

#[derive(Default)]
pub struct ScriptedDriver {
    responses: Vec<(String, Response)>,
    current: Vec<Scripted>,
    position: usize,
    fetched: usize,
    diagnostics: Vec<Diagnostic>,
    pub executed: Vec<String>,
    pub closed_cursors: usize,
    pub disconnects: usize,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `results`
    pub fn on(mut self, sql: &str, results: Vec<Scripted>) -> Self {
        let response = Response::Results(results);
        self.responses.push((sql.to_string(), response));
        self
    }

    /// Answer `sql` with a server error
    pub fn fail_on(mut self, sql: &str, sql_state: &str, message: &str) -> Self {
        let payload = ErrPayload {
            error_code: 1064,
            sql_state: sql_state.to_string(),
            message: message.to_string(),
        };
        let response = Response::Fails(payload);
        self.responses.push((sql.to_string(), response));
        self
    }

    fn server_error(&mut self, payload: ErrPayload) -> Error {
        self.diagnostics.push(Diagnostic::from(&payload));
        Error::ServerError(payload)
    }

    fn current(&self) -> Option<&Scripted> {
        self.current.get(self.position)
    }

    fn fail_after(&self) -> Option<usize> {
        match self.current() {
            Some(Scripted::Rows { fail_after, .. }) => *fail_after,
            _ => None,
        }
    }
}

impl Driver for ScriptedDriver {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed.push(sql.to_string());
        self.current.clear();
        self.position = 0;
        self.fetched = 0;

        let response = self
            .responses
            .iter()
            .find(|(known, _)| known == sql)
            .map(|(_, response)| match response {
                Response::Results(results) => Ok(results.clone()),
                Response::Fails(payload) => Err(payload.clone()),
            });
        match response {
            Some(Ok(results)) => {
                self.current = results;
                Ok(())
            }
            Some(Err(payload)) => Err(self.server_error(payload)),
            None => {
                let payload = ErrPayload {
                    error_code: 1064,
                    sql_state: "42000".to_string(),
                    message: format!("unexpected statement: {sql}"),
                };
                Err(self.server_error(payload))
            }
        }
    }

    fn column_count(&mut self) -> Result<usize> {
        Ok(match self.current() {
            Some(Scripted::Rows { columns, .. }) => columns.len(),
            _ => 0,
        })
    }

    fn describe_column(&mut self, index: usize) -> Result<ColumnDescriptor> {
        match self.current() {
            Some(Scripted::Rows { columns, .. }) if index < columns.len() => {
                Ok(ColumnDescriptor::new(&columns[index], index + 1, 0xfd, 32))
            }
            _ => Err(Error::InvalidPacket),
        }
    }

    fn fetch_row(&mut self, row: &mut RowBuffer) -> Result<Fetch> {
        let fetched = self.fetched;
        if self.fail_after() == Some(fetched) {
            let payload = ErrPayload {
                error_code: 2013,
                sql_state: "HY000".to_string(),
                message: "Lost connection to MySQL server during query".to_string(),
            };
            self.fetched = usize::MAX;
            return Err(self.server_error(payload));
        }
        let Some(Scripted::Rows { rows, .. }) = self.current.get(self.position) else {
            return Ok(Fetch::NoData);
        };
        let Some(values) = rows.get(fetched) else {
            return Ok(Fetch::NoData);
        };
        for (field, value) in row.fields_mut().iter_mut().zip(values) {
            match value {
                Some(v) => field.set(v.as_bytes()),
                None => field.set_null(),
            }
        }
        self.fetched += 1;
        Ok(Fetch::Row)
    }

    fn more_results(&mut self) -> Result<bool> {
        if self.position >= self.current.len() {
            return Ok(false);
        }
        self.position += 1;
        self.fetched = 0;
        Ok(self.position < self.current.len())
    }

    fn affected_rows(&self) -> Option<u64> {
        match self.current() {
            Some(Scripted::Info(affected)) => Some(*affected),
            _ => None,
        }
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn close_cursor(&mut self) -> Result<()> {
        self.closed_cursors += 1;
        self.current.clear();
        self.position = 0;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.disconnects += 1;
        Ok(())
    }
}
