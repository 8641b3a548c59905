//! Event log: one `HH:MM:SS message` line per event.
//!
//! Events are plain `tracing` macros. `info!` lines are always written,
//! `debug!` lines only in verbose mode.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;

use crate::error::{Error, Result, eyre};

/// Prefixes each event with the local wall-clock time and drops everything
/// else the default formatter would add (level, target, spans)
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockFormat;

impl<S, N> FormatEvent<S, N> for ClockFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} ", Local::now().format("%H:%M:%S"))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn max_level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::INFO }
}

/// Install the global subscriber. With `log_file` the log is appended to
/// that file (created when missing), otherwise it goes to standard output.
pub fn init(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| Error::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .with_max_level(max_level(verbose))
        .event_format(ClockFormat)
        .with_writer(writer)
        .try_init()
        .map_err(|e| Error::LibraryBug(eyre!("cannot install log subscriber: {e}")))
}
