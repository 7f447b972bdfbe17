//! The acquisition cycle.
//!
//! Each tick acquires one Sample, renders it to the active sink and, when
//! logging to a file, decides whether to roll over. Signal requests are
//! only acted upon between ticks, so a Sample is never half written.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::acquisition::Acquirer;
use crate::clock::Clock;
use crate::config::Timing;
use crate::error::Result;
use crate::rollover::RolloverPolicy;
use crate::sample::Timestamp;
use crate::signals::SignalFlags;
use crate::sinks::{ActiveSink, Sink};

/// Why the scheduler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    pub signal: i32,
}

impl Shutdown {
    /// Conventional status for death by signal: 128 + signal number.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(128 + self.signal).unwrap_or(u8::MAX)
    }
}

/// Stand-in deadline when the period would overflow the monotonic clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// How often, and how, ticks are spaced.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub period: Duration,
    pub timing: Timing,
}

pub struct Scheduler {
    acquirer: Acquirer,
    sink: ActiveSink,
    rollover: RolloverPolicy,
    flags: Arc<SignalFlags>,
    clock: Arc<dyn Clock>,
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(
        acquirer: Acquirer,
        sink: ActiveSink,
        rollover: RolloverPolicy,
        flags: Arc<SignalFlags>,
        clock: Arc<dyn Clock>,
        cadence: Cadence,
    ) -> Self {
        Self {
            acquirer,
            sink,
            rollover,
            flags,
            clock,
            cadence,
        }
    }

    /// Runs one acquisition cycle.
    pub fn tick(&mut self) -> Result<()> {
        let now = self.clock.now();
        let sample = self.acquirer.acquire(now);

        if let Err(e) = self.sink.publish(&sample) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("Failed to write {} output: {}", self.sink.kind(), e);
        }

        if let ActiveSink::Logfile(logfile) = &mut self.sink {
            if self.rollover.evaluate(now) {
                let at = Timestamp::new(self.clock.now());
                logfile.rollover(&at)?;
                debug!("Scheduled rollover on {} at {}", at.date(), at.time());
            }
        }
        Ok(())
    }

    /// Rolls the logfile over immediately.
    ///
    /// Only honoured when logging to a file with rollover enabled.
    pub fn force_rollover(&mut self) -> Result<()> {
        match &mut self.sink {
            ActiveSink::Logfile(logfile) if self.rollover.enabled() => {
                let now = self.clock.now();
                logfile.rollover(&Timestamp::new(now))?;
                self.rollover.mark(now);
                debug!("Forced rollover to {}", logfile.path().display());
            }
            _ => debug!("Rollover requested but logfile rollover is not enabled"),
        }
        Ok(())
    }

    /// Acts on pending signal requests.
    ///
    /// Returns the shutdown reason once a termination signal is seen,
    /// including while paused.
    pub async fn handle_pending(&mut self) -> Result<Option<Shutdown>> {
        if let Some(signal) = self.flags.take_shutdown() {
            return Ok(Some(Shutdown { signal }));
        }

        let pause = self.flags.take_pause();
        let resume = self.flags.take_resume();
        if pause && !resume {
            if let Some(shutdown) = self.wait_for_resume().await {
                return Ok(Some(shutdown));
            }
        }

        if self.flags.take_rollover() {
            self.force_rollover()?;
        }

        if self.flags.take_snapshot() {
            match &mut self.sink {
                ActiveSink::Pipe(pipe) => pipe.snapshot(),
                other => warn!("Snapshot requested but output is {}", other.kind()),
            }
        }

        Ok(None)
    }

    async fn wait_for_resume(&mut self) -> Option<Shutdown> {
        info!("Data collection paused");
        loop {
            if let Some(signal) = self.flags.take_shutdown() {
                return Some(Shutdown { signal });
            }
            if self.flags.take_resume() {
                info!("Data collection resumed");
                return None;
            }
            self.flags.wait().await;
        }
    }

    /// Drives the cycle until a termination signal or a fatal error.
    pub async fn run(mut self) -> Result<Shutdown> {
        info!(
            "Sampling every {:?} ({:?} timing) to {}",
            self.cadence.period,
            self.cadence.timing,
            self.sink.kind()
        );
        let flags = Arc::clone(&self.flags);
        let mut deadline = Instant::now();

        loop {
            self.tick()?;

            deadline = next_deadline(deadline, Instant::now(), &self.cadence);

            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    _ = flags.wait() => {
                        if let Some(shutdown) = self.handle_pending().await? {
                            info!("Received signal {}, shutting down", shutdown.signal);
                            self.close();
                            return Ok(shutdown);
                        }
                    }
                }
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.sink.close() {
            error!("Failed to close {} output: {}", self.sink.kind(), e);
        }
    }

    #[cfg(test)]
    fn sink(&self) -> &ActiveSink {
        &self.sink
    }

    #[cfg(test)]
    fn rollover_policy(&self) -> &RolloverPolicy {
        &self.rollover
    }
}

/// Computes when the next tick is due.
///
/// Aligned timing keeps `previous + period` so cycle cost does not drift the
/// schedule, re-anchoring to `now` after an overrun. Fixed-sleep timing
/// sleeps the full period from `now`.
fn next_deadline(previous: Instant, now: Instant, cadence: &Cadence) -> Instant {
    let after = |from: Instant| from.checked_add(cadence.period).unwrap_or(from + FAR_FUTURE);
    match cadence.timing {
        Timing::Aligned => {
            let next = after(previous);
            if next < now {
                debug!("Cycle overran by {:?}, re-anchoring", now - next);
                now
            } else {
                next
            }
        }
        Timing::FixedSleep => after(now),
    }
}
