//! On-demand publication through a named pipe.
//!
//! Every cycle only records the latest Sample. A snapshot request writes it
//! to the FIFO without blocking: with no reader attached the snapshot is
//! dropped with a warning.

use std::ffi::CString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::Sink;
use crate::error::{Error, Result};
use crate::sample::Sample;

pub struct PipeSink {
    path: PathBuf,
    latest: Option<Sample>,
    removed: bool,
}

impl PipeSink {
    /// Creates the FIFO at `path`; fails if anything already exists there.
    pub fn create(path: &Path) -> Result<Self> {
        if fs::symlink_metadata(path).is_ok() {
            return Err(Error::PipeExists(path.to_path_buf()));
        }

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| Error::PipeCreate {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;
        // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
        if unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) } != 0 {
            return Err(Error::PipeCreate {
                path: path.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }
        info!("Publishing snapshots through {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            latest: None,
            removed: false,
        })
    }

    /// Writes the latest Sample to the FIFO if a reader is attached.
    pub fn snapshot(&mut self) {
        let Some(sample) = &self.latest else {
            warn!("Snapshot requested before the first sample");
            return;
        };

        let mut fifo = match OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
        {
            Ok(fifo) => fifo,
            Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                warn!("No reader on {}, snapshot dropped", self.path.display());
                return;
            }
            Err(e) => {
                warn!("Failed to open {}: {}", self.path.display(), e);
                return;
            }
        };

        match writeln!(fifo, "{}", sample.log_line()) {
            Ok(()) => debug!("Snapshot written to {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                warn!("Reader on {} went away, snapshot dropped", self.path.display())
            }
            Err(e) => warn!("Failed to write snapshot to {}: {}", self.path.display(), e),
        }
    }

    fn remove(&mut self) -> io::Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        fs::remove_file(&self.path)?;
        info!("Removed {}", self.path.display());
        Ok(())
    }
}

impl Sink for PipeSink {
    fn publish(&mut self, sample: &Sample) -> Result<()> {
        self.latest = Some(sample.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.remove().map_err(Error::Output)
    }
}

impl Drop for PipeSink {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}
