//! Line-per-cycle output on stdout.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

use super::Sink;
use crate::error::Result;
use crate::sample::Sample;

const NULL_DEVICE: &str = "/dev/null";

pub struct StdoutSink {
    out: Box<dyn Write + Send>,
    fd_link: PathBuf,
}

impl StdoutSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()), PathBuf::from("/proc/self/fd/1"))
    }

    /// `fd_link` is the procfs link naming what `out` is connected to.
    pub fn new(out: Box<dyn Write + Send>, fd_link: PathBuf) -> Self {
        Self { out, fd_link }
    }

    /// Re-checked every cycle; the descriptor may be redirected at any time.
    fn discarded(&self) -> bool {
        matches!(fs::read_link(&self.fd_link), Ok(target) if target == Path::new(NULL_DEVICE))
    }
}

impl Sink for StdoutSink {
    fn publish(&mut self, sample: &Sample) -> Result<()> {
        if self.discarded() {
            trace!("stdout is {}, sample skipped", NULL_DEVICE);
            return Ok(());
        }
        writeln!(self.out, "{}", sample.log_line())?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Readings, Timestamp};
    use crate::testing::{noon, SharedBuffer};
    use std::os::unix::fs::symlink;

    fn sample() -> Sample {
        Sample::new(Timestamp::new(noon()), Readings::default(), 1024.25)
    }

    #[test]
    fn test_writes_one_line_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("1");
        symlink(dir.path().join("terminal"), &link).unwrap();

        let buffer = SharedBuffer::default();
        let mut sink = StdoutSink::new(Box::new(buffer.clone()), link);
        sink.publish(&sample()).unwrap();
        sink.publish(&sample()).unwrap();

        assert_eq!(buffer.contents().lines().count(), 2);
    }

    #[test]
    fn test_skips_output_to_null_device() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("1");
        symlink("/dev/null", &link).unwrap();

        let buffer = SharedBuffer::default();
        let mut sink = StdoutSink::new(Box::new(buffer.clone()), link.clone());
        sink.publish(&sample()).unwrap();
        assert!(buffer.contents().is_empty());

        // Redirection is noticed on the next cycle.
        fs::remove_file(&link).unwrap();
        symlink(dir.path().join("terminal"), &link).unwrap();
        sink.publish(&sample()).unwrap();
        assert_eq!(buffer.contents().lines().count(), 1);
    }
}
