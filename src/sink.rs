use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Output path of resultset `index` (1-based).
///
/// The first resultset writes to `base` itself. Later ones get `-NN` inserted
/// before the extension of the file name, or appended when it has none:
/// `out.csv` gives `out-02.csv`, `dump` gives `dump-02`.
pub fn numbered_path(base: &Path, index: usize) -> PathBuf {
    if index <= 1 {
        return base.to_path_buf();
    }
    let suffix = format!("-{index:02}");

    let Some(name) = base.file_name() else {
        let mut path = base.as_os_str().to_owned();
        path.push(&suffix);
        return PathBuf::from(path);
    };
    let name = name.to_string_lossy();
    let numbered = match name.rfind('.') {
        Some(dot) => format!("{}{suffix}{}", &name[..dot], &name[dot..]),
        None => format!("{name}{suffix}"),
    };
    base.with_file_name(numbered)
}

/// Output file of one resultset
#[derive(Debug)]
pub struct Sink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Sink {
    /// Create (or truncate) the file
    pub fn create(path: PathBuf) -> Result<Self> {
        match File::create(&path) {
            Ok(file) => Ok(Self {
                path,
                writer: BufWriter::new(file),
            }),
            Err(source) => Err(Error::OutputFile { path, source }),
        }
    }

    /// Create the file for resultset `index` of the run writing to `base`
    pub fn open_for_resultset(base: &Path, index: usize) -> Result<Self> {
        Self::create(numbered_path(base, index))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let written = self.writer.write_all(bytes);
        written.map_err(|source| self.io_error(source))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|source| self.io_error(source))
    }

    /// Flush and close the file
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        let Self { path, writer } = self;
        let synced = match writer.into_inner() {
            Ok(file) => file.sync_all(),
            Err(e) => Err(e.into_error()),
        };
        synced.map_err(|source| Error::OutputFile { path, source })
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::OutputFile {
            path: self.path.clone(),
            source,
        }
    }
}
