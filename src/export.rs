use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::driver::{Driver, Severity, report_diagnostics};
use crate::encoder::FieldEncoder;
use crate::error::Result;
use crate::resolver::{CatalogDialect, resolve};
use crate::resultset::ResultsetIterator;
use crate::sink::{Sink, numbered_path};

/// Rows written between two flushes of the output file
pub const FLUSH_EVERY: u64 = 1000;

/// What a finished export wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows written per resultset, in output order
    pub rows: Vec<u64>,
}

impl ExportSummary {
    pub fn resultsets(&self) -> usize {
        self.rows.len()
    }

    pub fn total_rows(&self) -> u64 {
        self.rows.iter().sum()
    }
}

/// Resolve `source_query`, run it, and write every resultset with columns
/// to its own file.
///
/// The statement is closed on success. On failure the caller owns cleanup of
/// the connection.
pub fn export<D: Driver + ?Sized>(
    driver: &mut D,
    source_query: &str,
    config: &ExportConfig,
    dialect: &dyn CatalogDialect,
) -> Result<ExportSummary> {
    let statement = resolve(source_query, driver, dialect)?;
    info!("{}", statement.description);

    if let Err(e) = driver.execute(&statement.sql) {
        report_diagnostics(driver, Severity::Critical);
        return Err(e);
    }
    report_diagnostics(driver, Severity::Info);

    let encoder = FieldEncoder::new(config);
    let mut summary = ExportSummary::default();
    let mut buffer = Vec::new();

    let mut resultsets = ResultsetIterator::new(&mut *driver);
    while let Some(mut resultset) = resultsets.advance()? {
        let path = numbered_path(&config.output_path, resultset.index());
        info!("Output is set to {}", path.display());
        let mut sink = Sink::create(path)?;

        if config.column_names {
            debug!("Writing column names");
            buffer.clear();
            encoder.encode_header(&mut buffer, resultset.columns());
            sink.write_all(&buffer)?;
        }

        debug!("Starting to write records...");
        let mut rows = 0u64;
        while let Some(row) = resultset.next_row() {
            buffer.clear();
            encoder.encode_row(&mut buffer, row);
            sink.write_all(&buffer)?;
            rows += 1;
            if rows.is_multiple_of(FLUSH_EVERY) {
                sink.flush()?;
                debug!("{rows} rows done");
            }
        }
        info!("{rows} rows returned");

        sink.close()?;
        summary.rows.push(rows);
    }
    drop(resultsets);

    if let Err(e) = driver.close_cursor() {
        report_diagnostics(driver, Severity::Critical);
        return Err(e);
    }
    Ok(summary)
}
