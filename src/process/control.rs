//! Child Process Control
//!
//! Exit polling, termination requests and background reaping for the
//! assistant process. The relay and the controller share one
//! [`ProcessControl`] through an `Arc`.

use std::process::Child;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// How often the reaper checks for exit
const REAP_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a non-blocking exit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Exited; the code is `None` when the child died from a signal
    Exited(Option<i32>),
}

impl ProcessStatus {
    pub fn has_exited(&self) -> bool {
        matches!(self, ProcessStatus::Exited(_))
    }
}

/// Signals the controller can deliver to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Interrupt (Ctrl+C); aider cancels the current reply
    Interrupt,
    /// Polite shutdown request
    Terminate,
}

/// Lifecycle operations the relay and the controller need from a child
pub trait ChildControl: Send + Sync {
    /// OS process id, if there is one
    fn pid(&self) -> Option<u32>;

    /// Non-blocking exit check
    fn poll(&self) -> ProcessStatus;

    /// Ask the child to shut down; `Ok` if it is already gone
    fn terminate(&self) -> Result<()>;
}

/// [`ChildControl`] over a real `std::process::Child`
#[derive(Debug)]
pub struct ProcessControl {
    pid: u32,
    child: Mutex<Child>,
}

impl ProcessControl {
    pub fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Mutex::new(child),
        }
    }

    pub fn id(&self) -> u32 {
        self.pid
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver `signal` to the child
    pub fn signal(&self, signal: Signal) -> Result<()> {
        if self.poll().has_exited() {
            debug!("Process {} already exited, not sending {:?}", self.pid, signal);
            return Ok(());
        }
        self.send_signal(signal)
    }

    #[cfg(unix)]
    fn send_signal(&self, signal: Signal) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal as NixSignal};
        use nix::unistd::Pid;

        let nix_signal = match signal {
            Signal::Interrupt => NixSignal::SIGINT,
            Signal::Terminate => NixSignal::SIGTERM,
        };

        match kill(Pid::from_raw(self.pid as i32), nix_signal) {
            Ok(()) => {
                debug!("Sent {:?} to process {}", nix_signal, self.pid);
                Ok(())
            }
            // Exited between the poll and the kill
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(Error::TerminateFailed {
                pid: self.pid,
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn send_signal(&self, signal: Signal) -> Result<()> {
        match signal {
            Signal::Terminate => self.lock().kill().map_err(|e| Error::TerminateFailed {
                pid: self.pid,
                reason: e.to_string(),
            }),
            Signal::Interrupt => Err(Error::TerminateFailed {
                pid: self.pid,
                reason: format!("interrupt is not supported on {}", std::env::consts::OS),
            }),
        }
    }

    /// Reap the child on a detached thread once it exits
    ///
    /// There is no escalation to a forced kill; a child that ignores the
    /// termination request keeps this thread alive until it exits.
    pub fn reap_in_background(self: std::sync::Arc<Self>) {
        let pid = self.pid;
        let spawned = thread::Builder::new()
            .name(format!("aiderchat-reaper-{}", pid))
            .spawn(move || loop {
                if let ProcessStatus::Exited(code) = self.poll() {
                    debug!("Reaped process {} (exit code {:?})", pid, code);
                    break;
                }
                thread::sleep(REAP_INTERVAL);
            });

        if let Err(e) = spawned {
            warn!("Failed to start reaper thread for process {}: {}", pid, e);
        }
    }
}

impl ChildControl for ProcessControl {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn poll(&self) -> ProcessStatus {
        match self.lock().try_wait() {
            Ok(Some(status)) => ProcessStatus::Exited(status.code()),
            Ok(None) => ProcessStatus::Running,
            Err(e) => {
                warn!("Failed to poll process {}: {}", self.pid, e);
                ProcessStatus::Exited(None)
            }
        }
    }

    fn terminate(&self) -> Result<()> {
        self.signal(Signal::Terminate)
    }
}
