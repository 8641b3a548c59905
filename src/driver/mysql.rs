use std::io::{BufReader, Read, Write};
use std::net::TcpStream;

use tracing::instrument;

use crate::constant::{CapabilityFlags, CommandByte};
use crate::driver::{ColumnDescriptor, Diagnostic, Driver, Fetch, RowBuffer};
use crate::error::{Error, Result, eyre};
use crate::opts::Opts;
use crate::protocol::column::ColumnDefinition;
use crate::protocol::handshake::{Handshake, HandshakeAction};
use crate::protocol::packet::{read_payload, write_command, write_payload};
use crate::protocol::query::{
    QueryResponse, RowPacket, decode_text_row, read_query_response, read_row_packet, write_query,
};
use crate::protocol::response::{OkPayload, OkPayloadBytes};

/// Where the statement cursor currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// No statement executed
    Idle,
    /// Positioned on a zero-column resultset
    Informational { more: bool },
    /// Positioned on a resultset with rows still on the wire
    Rows,
    /// Rows of the current resultset are consumed
    RowsDone { more: bool },
    /// Statement fully consumed
    Finished,
}

/// MySQL text protocol driver over a blocking stream
pub struct MysqlDriver<S: Read + Write = TcpStream> {
    stream: BufReader<S>,
    read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
    capability_flags: CapabilityFlags,
    server_version: String,
    cursor: Cursor,
    columns: Vec<ColumnDescriptor>,
    affected_rows: Option<u64>,
    diagnostics: Vec<Diagnostic>,
    connected: bool,
}

impl MysqlDriver<TcpStream> {
    /// Open a TCP connection and authenticate
    #[instrument(skip_all)]
    pub fn connect(opts: &Opts) -> Result<Self> {
        let stream = TcpStream::connect((opts.host.as_str(), opts.port))?;
        stream.set_nodelay(opts.tcp_nodelay)?;
        Self::handshake(stream, &opts.user, &opts.password, opts.db.as_deref())
    }
}

impl<S: Read + Write> MysqlDriver<S> {
    /// Run the connection phase over an already open stream
    pub fn handshake(
        stream: S,
        username: &str,
        password: &str,
        database: Option<&str>,
    ) -> Result<Self> {
        let mut stream = BufReader::new(stream);
        let mut buffer = Vec::new();
        let mut handshake = Handshake::new(
            username.to_string(),
            password.to_string(),
            database.map(ToString::to_string),
        );

        loop {
            let mut last_sequence_id = read_payload(&mut stream, &mut buffer)?;
            match handshake.drive(&buffer)? {
                HandshakeAction::Write(payload) => {
                    write_payload(stream.get_mut(), &mut last_sequence_id, &payload)?;
                }
                HandshakeAction::Read => {}
                HandshakeAction::Connected {
                    capability_flags,
                    initial_handshake,
                } => {
                    let mut driver = Self::from_stream(stream, capability_flags);
                    driver.server_version = initial_handshake.server_version;
                    return Ok(driver);
                }
            }
        }
    }

    /// Wrap a stream that has already completed the connection phase
    pub(crate) fn from_stream(stream: BufReader<S>, capability_flags: CapabilityFlags) -> Self {
        Self {
            stream,
            read_buffer: Vec::new(),
            write_buffer: Vec::new(),
            capability_flags,
            server_version: String::new(),
            cursor: Cursor::Idle,
            columns: Vec::new(),
            affected_rows: None,
            diagnostics: Vec::new(),
            connected: true,
        }
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    fn deprecate_eof(&self) -> bool {
        self.capability_flags
            .contains(CapabilityFlags::CLIENT_DEPRECATE_EOF)
    }

    fn read_packet(&mut self) -> Result<()> {
        read_payload(&mut self.stream, &mut self.read_buffer)?;
        Ok(())
    }

    /// Record what went wrong and give up on the rest of the statement
    fn fail(&mut self, err: Error) -> Error {
        if let Error::ServerError(payload) = &err {
            self.diagnostics.push(Diagnostic::from(payload));
        }
        self.cursor = Cursor::Finished;
        err
    }

    fn note_status(&mut self, ok: &OkPayload) {
        if ok.warnings > 0 {
            self.diagnostics.push(Diagnostic {
                sql_state: "01000".to_string(),
                native_error: 0,
                message: format!("{} warning(s)", ok.warnings),
            });
        }
    }

    /// Read the first packet of the next resultset and position on it
    #[instrument(skip_all)]
    fn read_resultset_start(&mut self) -> Result<()> {
        self.columns.clear();
        self.affected_rows = None;

        if let Err(e) = self.read_packet() {
            return Err(self.fail(e));
        }

        let start = match read_query_response(&self.read_buffer) {
            Ok(QueryResponse::Ok(bytes)) => OkPayload::try_from(bytes).map(Ok),
            Ok(QueryResponse::ResultSet { column_count }) => Ok(Err(column_count)),
            Err(e) => Err(e),
        };

        match start {
            Ok(Ok(ok)) => {
                self.note_status(&ok);
                self.affected_rows = Some(ok.affected_rows);
                self.cursor = Cursor::Informational {
                    more: ok.more_results(),
                };
                Ok(())
            }
            Ok(Err(column_count)) => match self.read_column_definitions(column_count) {
                Ok(()) => {
                    self.cursor = Cursor::Rows;
                    Ok(())
                }
                Err(e) => Err(self.fail(e)),
            },
            Err(e) => Err(self.fail(e)),
        }
    }

    fn read_column_definitions(&mut self, column_count: usize) -> Result<()> {
        self.columns.reserve(column_count);
        for ordinal in 1..=column_count {
            self.read_packet()?;
            let definition = ColumnDefinition::parse(&self.read_buffer)?;
            self.columns.push(definition.to_descriptor(ordinal));
        }
        if !self.deprecate_eof() {
            self.read_packet()?;
        }
        Ok(())
    }

    fn end_of_rows(&self, bytes: OkPayloadBytes<'_>) -> Result<OkPayload> {
        if self.deprecate_eof() {
            OkPayload::try_from(bytes)
        } else {
            OkPayload::from_legacy_eof(bytes)
        }
    }

    /// Read one packet of the row stream. `Ok(None)` means the packet was a
    /// row and is left in the read buffer.
    fn next_row_packet(&mut self) -> Result<Option<OkPayload>> {
        if let Err(e) = self.read_packet() {
            return Err(self.fail(e));
        }
        let end = match read_row_packet(&self.read_buffer) {
            Ok(RowPacket::Row(_)) => return Ok(None),
            Ok(RowPacket::End(bytes)) => self.end_of_rows(bytes),
            Err(e) => Err(e),
        };
        match end {
            Ok(ok) => {
                self.note_status(&ok);
                self.cursor = Cursor::RowsDone {
                    more: ok.more_results(),
                };
                Ok(Some(ok))
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

impl<S: Read + Write> Driver for MysqlDriver<S> {
    #[instrument(skip_all)]
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.close_cursor()?;

        self.write_buffer.clear();
        write_query(&mut self.write_buffer, sql);
        write_command(self.stream.get_mut(), &self.write_buffer)?;

        self.read_resultset_start()
    }

    fn column_count(&mut self) -> Result<usize> {
        match self.cursor {
            Cursor::Rows | Cursor::RowsDone { .. } => Ok(self.columns.len()),
            Cursor::Idle | Cursor::Informational { .. } | Cursor::Finished => Ok(0),
        }
    }

    fn describe_column(&mut self, index: usize) -> Result<ColumnDescriptor> {
        if let Some(column) = self.columns.get(index) {
            return Ok(column.clone());
        }
        let count = self.columns.len();
        Err(Error::LibraryBug(eyre!("column {index} out of {count} columns")))
    }

    fn fetch_row(&mut self, row: &mut RowBuffer) -> Result<Fetch> {
        if self.cursor != Cursor::Rows {
            return Ok(Fetch::NoData);
        }
        if self.next_row_packet()?.is_some() {
            return Ok(Fetch::NoData);
        }
        match decode_text_row(&self.read_buffer, row) {
            Ok(()) => Ok(Fetch::Row),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn more_results(&mut self) -> Result<bool> {
        if self.cursor == Cursor::Rows {
            while self.next_row_packet()?.is_none() {}
        }
        match self.cursor {
            Cursor::Informational { more: true } | Cursor::RowsDone { more: true } => {
                self.read_resultset_start()?;
                Ok(true)
            }
            _ => {
                self.cursor = Cursor::Finished;
                Ok(false)
            }
        }
    }

    fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }

    fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn close_cursor(&mut self) -> Result<()> {
        if self.cursor != Cursor::Idle {
            while self.more_results()? {}
            self.columns.clear();
            self.cursor = Cursor::Idle;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.cursor = Cursor::Idle;
        write_command(self.stream.get_mut(), &[CommandByte::Quit as u8])
    }
}
