use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::config::{
    CatalogKind, ExportConfig, parse_bool_word, parse_delimiter, parse_field_delimiter,
};
use crate::error::{Error, Result};
use crate::opts::Opts;

/// Export every resultset of a query, table, view, procedure or script to
/// delimited text files
#[derive(Parser, Debug)]
#[command(name = "export2csv")]
#[command(override_usage = "export2csv [options] <table|view|query|file.sql> <output_file>")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// DSN used to connect to the database server
    #[arg(short = 'D', value_name = "text")]
    pub dsn: String,

    /// ID to connect
    #[arg(short = 'U', value_name = "text")]
    pub user: String,

    /// Password to connect
    #[arg(short = 'P', value_name = "text")]
    pub password: String,

    /// Log file, `-` for standard output
    #[arg(short = 'l', value_name = "text", default_value = "-")]
    pub log_file: PathBuf,

    /// Delimiter between fields
    #[arg(short = 'f', value_name = "text", default_value = r"\t")]
    #[arg(value_parser = parse_field_delimiter)]
    pub field_delimiter: String,

    /// Delimiter between records
    #[arg(short = 'r', value_name = "text", default_value = r"\n")]
    #[arg(value_parser = parse_delimiter)]
    pub record_delimiter: String,

    /// Include column names
    #[arg(short = 'n', value_name = "bool", default_value = "no")]
    #[arg(num_args = 0..=1, default_missing_value = "yes")]
    #[arg(action = ArgAction::Set, value_parser = parse_bool_word)]
    pub column_names: bool,

    /// Surround text values with double quotes
    #[arg(short = 'q', value_name = "bool", default_value = "no")]
    #[arg(num_args = 0..=1, default_missing_value = "yes")]
    #[arg(action = ArgAction::Set, value_parser = parse_bool_word)]
    pub quote_strings: bool,

    /// Trim char fields padded with spaces
    #[arg(short = 't', value_name = "bool", default_value = "yes")]
    #[arg(num_args = 0..=1, default_missing_value = "yes")]
    #[arg(action = ArgAction::Set, value_parser = parse_bool_word)]
    pub trim_strings: bool,

    /// Verbose log
    #[arg(short = 'v', value_name = "bool", default_value = "no")]
    #[arg(num_args = 0..=1, default_missing_value = "yes")]
    #[arg(action = ArgAction::Set, value_parser = parse_bool_word)]
    pub verbose: bool,

    /// Catalog used to classify a bare object name
    #[arg(long = "catalog", value_enum, default_value_t = CatalogKind::Mysql)]
    pub catalog: CatalogKind,

    /// Print usage
    #[arg(short = 'h', short_alias = '?', action = ArgAction::Help)]
    pub help: Option<bool>,

    /// Table, view, procedure, SQL statement or `.sql` script
    #[arg(value_name = "table|view|query|file.sql")]
    pub source_query: String,

    /// Output file of the first resultset
    #[arg(value_name = "output_file")]
    pub output_file: PathBuf,
}

impl Cli {
    /// Parse the command line. Every failure, including a help request,
    /// is a usage error carrying the text to print.
    pub fn parse_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| Error::Usage(e.render().to_string()))
    }

    /// `None` when the log goes to standard output
    pub fn log_path(&self) -> Option<&Path> {
        if self.log_file.as_os_str() == "-" {
            None
        } else {
            Some(&self.log_file)
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            field_delimiter: self.field_delimiter.clone(),
            record_delimiter: self.record_delimiter.clone(),
            quote_strings: self.quote_strings,
            trim_strings: self.trim_strings,
            column_names: self.column_names,
            verbose: self.verbose,
            output_path: self.output_file.clone(),
            catalog: self.catalog,
        }
    }

    /// Connection options from `-D`, with `-U` and `-P` taking precedence
    /// over credentials embedded in the DSN
    pub fn opts(&self) -> Result<Opts> {
        let opts = Opts::try_from(self.dsn.as_str())?;
        Ok(opts.with_credentials(&self.user, &self.password))
    }
}
