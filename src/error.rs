use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

pub use color_eyre::eyre::eyre;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    #[error("Unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),

    #[error("{0}")]
    Usage(String),

    #[error("Error opening the log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error opening the query file {}: {source}", path.display())]
    QueryFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error opening the output file {}: {source}", path.display())]
    OutputFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Object {0} was not found")]
    ObjectNotFound(String),
}

impl Error {
    /// Process exit status for a run that failed with this error.
    ///
    /// * `1` - usage problems and local file I/O
    /// * `2` - anything the database connection reported
    /// * `3` - a bare object reference that is not a table, view or procedure
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Usage(_)
            | Error::LogFile { .. }
            | Error::QueryFile { .. }
            | Error::OutputFile { .. } => 1,
            Error::ObjectNotFound(_) => 3,
            Error::ServerError(_)
            | Error::IoError(_)
            | Error::BadConfigError(_)
            | Error::InvalidPacket
            | Error::UnexpectedEof
            | Error::UnsupportedAuthPlugin(_)
            | Error::LibraryBug(_) => 2,
        }
    }

    /// Reason written into the final log line.
    pub fn summary(&self) -> String {
        match self {
            Error::ObjectNotFound(_) => "Unrecoverable error".to_string(),
            Error::Usage(_)
            | Error::LogFile { .. }
            | Error::QueryFile { .. }
            | Error::OutputFile { .. } => self.to_string(),
            _ => "Unrecoverable driver error".to_string(),
        }
    }

    /// Server errors reach the log as diagnostic records and a missing object
    /// is logged where it is found missing, so neither needs a second line.
    pub fn is_logged(&self) -> bool {
        matches!(self, Error::ServerError(_) | Error::ObjectNotFound(_))
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

impl From<color_eyre::Report> for Error {
    fn from(report: color_eyre::Report) -> Self {
        Error::LibraryBug(report)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
