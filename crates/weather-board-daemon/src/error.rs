//! Error types for the daemon.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for fatal configuration, start-up and runtime errors.
pub const EXIT_FATAL: u8 = 255;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the sinks and the scheduler.
#[derive(Error, Debug)]
pub enum Error {
    /// Logfile could not be created at start-up.
    #[error("could not open logfile {path:?}: {source}")]
    LogfileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Line could not be written or synced to the logfile.
    #[error("could not write logfile {path:?}: {source}")]
    LogfileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Replacement logfile could not be created.
    #[error("problem rolling over (new logfile {path:?}): {source}")]
    Rollover {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Named pipe left behind by a running (or crashed) instance.
    #[error("named pipe {0:?} already exists (is another instance running?)")]
    PipeExists(PathBuf),

    /// Named pipe could not be created.
    #[error("could not create named pipe {path:?}: {source}")]
    PipeCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Signal handler registration failed.
    #[error("could not install signal handler: {0}")]
    Signal(#[source] io::Error),

    /// Terminal or stdout write failure.
    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    /// Returns true if the process must stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Output(_))
    }
}
