//! Output destinations for samples.

mod logfile;
mod pipe;
mod stdout;
mod terminal;

pub use logfile::{rollover_path, LogfileSink};
pub use pipe::PipeSink;
pub use stdout::StdoutSink;
pub use terminal::{dashboard, TerminalSink};

use chrono::{DateTime, Local};
use weather_board_hw::BoardVariant;

use crate::config::Output;
use crate::error::Result;
use crate::sample::{Sample, Timestamp};

/// Something a Sample can be rendered to.
pub trait Sink {
    /// Renders one Sample.
    fn publish(&mut self, sample: &Sample) -> Result<()>;

    /// Flushes and releases the destination.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The single destination selected at startup.
pub enum ActiveSink {
    Terminal(TerminalSink),
    Logfile(LogfileSink),
    Stdout(StdoutSink),
    Pipe(PipeSink),
}

impl ActiveSink {
    /// Opens the destination selected by `output`.
    ///
    /// `timestamped` names the first logfile after `start`, as rollover does.
    pub fn open(
        output: &Output,
        timestamped: bool,
        variant: BoardVariant,
        start: DateTime<Local>,
    ) -> Result<Self> {
        Ok(match output {
            Output::Terminal => ActiveSink::Terminal(TerminalSink::stdout(variant)),
            Output::Stdout => ActiveSink::Stdout(StdoutSink::stdout()),
            Output::Logfile(base) => {
                ActiveSink::Logfile(LogfileSink::open(base, timestamped, &Timestamp::new(start))?)
            }
            Output::Pipe(path) => ActiveSink::Pipe(PipeSink::create(path)?),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActiveSink::Terminal(_) => "terminal",
            ActiveSink::Logfile(_) => "logfile",
            ActiveSink::Stdout(_) => "stdout",
            ActiveSink::Pipe(_) => "pipe",
        }
    }

    fn inner(&mut self) -> &mut dyn Sink {
        match self {
            ActiveSink::Terminal(sink) => sink,
            ActiveSink::Logfile(sink) => sink,
            ActiveSink::Stdout(sink) => sink,
            ActiveSink::Pipe(sink) => sink,
        }
    }
}

impl Sink for ActiveSink {
    fn publish(&mut self, sample: &Sample) -> Result<()> {
        self.inner().publish(sample)
    }

    fn close(&mut self) -> Result<()> {
        self.inner().close()
    }
}
