use std::process::ExitCode;
use std::time::Instant;

use export2csv::args::Cli;
use export2csv::driver::Diagnostic;
use export2csv::export::export;
use export2csv::session::DriverSession;
use export2csv::{Error, MysqlDriver, Result, logging};
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let started = Instant::now();

    let cli = match Cli::parse_from_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            println!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = logging::init(cli.log_path(), cli.verbose) {
        report_startup_failure(&e);
        return ExitCode::from(e.exit_code());
    }

    let outcome = run(&cli);
    let reason = match &outcome {
        Ok(()) => "Ok".to_string(),
        Err(e) => {
            if !e.is_logged() {
                error!("{e}");
            }
            e.summary()
        }
    };
    info!(
        "process ended (in {} seconds): {reason}",
        started.elapsed().as_secs()
    );

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}

#[expect(clippy::print_stderr)]
fn report_startup_failure(e: &Error) {
    eprintln!("{e}");
}

fn run(cli: &Cli) -> Result<()> {
    let program = std::env::args_os().next();
    let program = program.unwrap_or_else(|| "export2csv".into());
    info!("{} started", program.to_string_lossy());
    info!("Connecting to DSN {{{}}}", cli.dsn);

    let opts = cli.opts()?;
    let driver = MysqlDriver::connect(&opts).inspect_err(|e| {
        if let Error::ServerError(payload) = e {
            error!("{}", Diagnostic::from(payload));
        }
    })?;
    let version = driver.server_version();
    debug!("Connection successful, server {version}");

    let config = cli.export_config();
    let dialect = config.catalog.dialect();

    let mut session = DriverSession::new(driver);
    let source = &cli.source_query;
    let summary = export(session.driver(), source, &config, dialect.as_ref());
    if let Err(e) = session.release() {
        debug!("Disconnect failed: {e}");
    }

    let summary = summary?;
    debug!(
        "{} resultsets, {} rows exported",
        summary.resultsets(),
        summary.total_rows()
    );
    Ok(())
}
