pub mod args;
pub mod config;
pub mod constant;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod export;
pub mod logging;
mod opts;
pub mod protocol;
pub mod resolver;
pub mod resultset;
pub mod session;
pub mod sink;

pub use config::ExportConfig;
pub use driver::Driver;
pub use driver::mysql::MysqlDriver;
pub use error::{Error, Result};
pub use opts::Opts;
