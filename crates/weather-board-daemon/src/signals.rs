//! Asynchronous signal handling.
//!
//! The listener task only records requests in [`SignalFlags`] and wakes the
//! scheduler; all I/O triggered by a signal happens in the scheduler between
//! cycles.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Pending requests raised by signals.
#[derive(Debug, Default)]
pub struct SignalFlags {
    rollover: AtomicBool,
    snapshot: AtomicBool,
    pause: AtomicBool,
    resume: AtomicBool,
    shutdown: AtomicI32,
    wake: Notify,
}

impl SignalFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_rollover(&self) {
        self.raise(&self.rollover);
    }

    pub fn request_snapshot(&self) {
        self.raise(&self.snapshot);
    }

    pub fn request_pause(&self) {
        self.raise(&self.pause);
    }

    pub fn request_resume(&self) {
        self.raise(&self.resume);
    }

    pub fn request_shutdown(&self, signo: i32) {
        self.shutdown.store(signo, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn take_rollover(&self) -> bool {
        self.rollover.swap(false, Ordering::SeqCst)
    }

    pub fn take_snapshot(&self) -> bool {
        self.snapshot.swap(false, Ordering::SeqCst)
    }

    pub fn take_pause(&self) -> bool {
        self.pause.swap(false, Ordering::SeqCst)
    }

    pub fn take_resume(&self) -> bool {
        self.resume.swap(false, Ordering::SeqCst)
    }

    /// Signal number of a pending shutdown request.
    pub fn take_shutdown(&self) -> Option<i32> {
        match self.shutdown.swap(0, Ordering::SeqCst) {
            0 => None,
            signo => Some(signo),
        }
    }

    /// Waits until a request is raised.
    ///
    /// A request raised while nobody is waiting is remembered, so the next
    /// call returns immediately.
    pub async fn wait(&self) {
        self.wake.notified().await;
    }

    fn raise(&self, flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

/// Owns the signal listener task; dropping it stops listening.
pub struct SignalController {
    task: JoinHandle<()>,
}

impl SignalController {
    /// Installs the handlers. SIGTSTP/SIGCONT are only taken over when
    /// `pause_resume` is set, otherwise they keep their default job control.
    pub fn install(flags: Arc<SignalFlags>, pause_resume: bool) -> Result<Self> {
        let listen = |kind: SignalKind| signal(kind).map_err(Error::Signal);

        let mut usr1 = listen(SignalKind::user_defined1())?;
        let mut usr2 = listen(SignalKind::user_defined2())?;
        let mut pipe = listen(SignalKind::pipe())?;
        let mut int = listen(SignalKind::interrupt())?;
        let mut quit = listen(SignalKind::quit())?;
        let mut hup = listen(SignalKind::hangup())?;
        let mut term = listen(SignalKind::terminate())?;
        let mut abrt = listen(SignalKind::from_raw(libc::SIGABRT))?;
        let (mut tstp, mut cont) = if pause_resume {
            (
                Some(listen(SignalKind::from_raw(libc::SIGTSTP))?),
                Some(listen(SignalKind::from_raw(libc::SIGCONT))?),
            )
        } else {
            (None, None)
        };

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(()) = usr1.recv() => {
                        debug!("SIGUSR1: rollover requested");
                        flags.request_rollover();
                    }
                    Some(()) = usr2.recv() => {
                        debug!("SIGUSR2: snapshot requested");
                        flags.request_snapshot();
                    }
                    Some(()) = recv_optional(&mut tstp) => {
                        info!("SIGTSTP: pausing data collection");
                        flags.request_pause();
                    }
                    Some(()) = recv_optional(&mut cont) => {
                        info!("SIGCONT: resuming data collection");
                        flags.request_resume();
                    }
                    Some(()) = pipe.recv() => {
                        warn!("SIGPIPE: reader went away");
                    }
                    Some(()) = int.recv() => flags.request_shutdown(libc::SIGINT),
                    Some(()) = quit.recv() => flags.request_shutdown(libc::SIGQUIT),
                    Some(()) = hup.recv() => flags.request_shutdown(libc::SIGHUP),
                    Some(()) = term.recv() => flags.request_shutdown(libc::SIGTERM),
                    Some(()) = abrt.recv() => flags.request_shutdown(libc::SIGABRT),
                    else => break,
                }
            }
        });

        Ok(Self { task })
    }
}

impl Drop for SignalController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn recv_optional(signal: &mut Option<Signal>) -> Option<()> {
    match signal {
        Some(signal) => signal.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flags_are_consumed_once() {
        let flags = SignalFlags::new();
        flags.request_rollover();
        flags.request_snapshot();

        assert!(flags.take_rollover());
        assert!(!flags.take_rollover());
        assert!(flags.take_snapshot());
        assert!(!flags.take_pause());
        assert_eq!(flags.take_shutdown(), None);

        flags.request_shutdown(libc::SIGTERM);
        assert_eq!(flags.take_shutdown(), Some(libc::SIGTERM));
        assert_eq!(flags.take_shutdown(), None);
    }

    #[tokio::test]
    async fn test_request_before_wait_is_remembered() {
        let flags = SignalFlags::new();
        flags.request_resume();
        tokio::time::timeout(Duration::from_secs(1), flags.wait())
            .await
            .unwrap();
        assert!(flags.take_resume());
    }

    #[tokio::test]
    async fn test_user_signals_set_flags() {
        let flags = Arc::new(SignalFlags::new());
        let _controller = SignalController::install(Arc::clone(&flags), false).unwrap();

        // SAFETY: handlers for both signals are installed above.
        unsafe { libc::kill(libc::getpid(), libc::SIGUSR1) };
        tokio::time::timeout(Duration::from_secs(5), flags.wait())
            .await
            .unwrap();
        assert!(flags.take_rollover());

        unsafe { libc::kill(libc::getpid(), libc::SIGUSR2) };
        tokio::time::timeout(Duration::from_secs(5), flags.wait())
            .await
            .unwrap();
        assert!(flags.take_snapshot());
    }
}
