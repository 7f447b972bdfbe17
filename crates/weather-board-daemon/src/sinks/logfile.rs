//! Append-one-line-per-cycle logfile with rollover.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::Sink;
use crate::error::{Error, Result};
use crate::sample::{Sample, Timestamp};

/// Name of the logfile started at `at`: `<base>.<date-time>`.
pub fn rollover_path(base: &str, at: &Timestamp) -> PathBuf {
    PathBuf::from(format!("{}.{}", base, at.datetime()))
}

pub struct LogfileSink {
    base: String,
    path: PathBuf,
    file: Option<File>,
}

impl LogfileSink {
    /// Creates (truncating) the first logfile.
    pub fn open(base: &str, timestamped: bool, at: &Timestamp) -> Result<Self> {
        let path = if timestamped {
            rollover_path(base, at)
        } else {
            PathBuf::from(base)
        };
        let file = File::create(&path).map_err(|source| Error::LogfileOpen {
            path: path.clone(),
            source,
        })?;
        info!("Logging to {}", path.display());

        Ok(Self {
            base: base.to_string(),
            path,
            file: Some(file),
        })
    }

    /// Current logfile name.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the current file and starts `<base>.<date-time>`.
    ///
    /// The old handle is synced and dropped before the new file is opened.
    pub fn rollover(&mut self, at: &Timestamp) -> Result<()> {
        self.close()?;

        let stamped = rollover_path(&self.base, at);
        let mut path = stamped.clone();
        let mut n = 0;
        while path == self.path {
            n += 1;
            path = PathBuf::from(format!("{}.{}", stamped.display(), n));
        }

        let file = File::create(&path).map_err(|source| Error::Rollover {
            path: path.clone(),
            source,
        })?;
        info!("Rolling over (new logfile {})", path.display());

        self.path = path;
        self.file = Some(file);
        Ok(())
    }
}

impl Sink for LogfileSink {
    fn publish(&mut self, sample: &Sample) -> Result<()> {
        let Self { path, file, .. } = self;
        let write_error = |source| Error::LogfileWrite {
            path: path.clone(),
            source,
        };

        let file = file
            .as_mut()
            .ok_or_else(|| write_error(io::Error::new(io::ErrorKind::Other, "logfile is closed")))?;
        writeln!(file, "{}", sample.log_line()).map_err(write_error)?;
        file.sync_data().map_err(write_error)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all().map_err(|source| Error::LogfileWrite {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
