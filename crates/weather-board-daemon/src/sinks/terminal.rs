//! Full-screen dashboard for an interactive terminal.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::os::fd::RawFd;
use tracing::trace;
use weather_board_hw::BoardVariant;

use super::Sink;
use crate::error::Result;
use crate::sample::Sample;

/// Cursor home, then erase display.
const CLEAR_SCREEN: &str = "\x1b[1;1H\x1b[2J";

pub struct TerminalSink {
    out: Box<dyn Write + Send>,
    fd: RawFd,
    variant: BoardVariant,
}

impl TerminalSink {
    pub fn stdout(variant: BoardVariant) -> Self {
        Self::new(Box::new(io::stdout()), libc::STDOUT_FILENO, variant)
    }

    pub fn new(out: Box<dyn Write + Send>, fd: RawFd, variant: BoardVariant) -> Self {
        Self { out, fd, variant }
    }

    fn interactive(&self) -> bool {
        // SAFETY: isatty only inspects the descriptor number.
        unsafe { libc::isatty(self.fd) == 1 }
    }
}

impl Sink for TerminalSink {
    fn publish(&mut self, sample: &Sample) -> Result<()> {
        if !self.interactive() {
            trace!("fd {} is not a terminal, dashboard skipped", self.fd);
            return Ok(());
        }
        write!(self.out, "{}{}", CLEAR_SCREEN, dashboard(sample, self.variant))?;
        self.out.flush()?;
        Ok(())
    }
}

/// Renders the dashboard text for one sample.
pub fn dashboard(sample: &Sample, variant: BoardVariant) -> String {
    let mut text = String::new();
    // Writing to a String cannot fail.
    let _ = write!(
        text,
        "\n    Weather Board (version {})\n\n    {}\n\n",
        env!("CARGO_PKG_VERSION"),
        sample.timestamp.datetime()
    );
    let _ = write!(
        text,
        "    ======== si1132 ========\n    \
         UV index    : {:4.2}\n    \
         visible     : {:6.2} lux\n    \
         IR          : {:6.2} lux\n",
        sample.uv_index, sample.visible_lux, sample.ir_lux
    );
    let _ = write!(
        text,
        "    ======== {} ========\n    \
         temperature : {:6.2} C\n    \
         humidity    : {:4.2} %\n    \
         dew point   : {:6.2} C\n    \
         pressure    : {:6.2} hPa\n    \
         altitude    : {:6.2} m\n\n",
        variant.climate_chips(),
        sample.temperature_c,
        sample.humidity_pct,
        sample.dew_point_c,
        sample.pressure_hpa,
        sample.altitude_m
    );
    text
}
