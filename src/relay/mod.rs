//! Output Relay
//!
//! A background thread that drains the assistant's merged output, rebuilds
//! line boundaries and publishes each completed line to the session log
//! and the delivery queue.
//!
//! The loop performs one blocking character read per iteration and checks
//! the [`StopSignal`] between reads. Stopping is advisory: a read already in
//! progress is not interrupted, which is why the controller also asks the
//! child to terminate (its exit closes the pipe and unblocks the read).
//!
//! On exit the relay flushes any unterminated partial line to the log,
//! raises the stop signal and appends the [`SESSION_ENDED`] sentinel.

pub mod assembler;
pub mod decoder;
pub mod log;
pub mod queue;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::RelayConfig;
use crate::models::LineKind;
use crate::process::{ChildControl, ProcessStatus};

pub use assembler::LineAssembler;
pub use decoder::{CharReader, OutputSource};
pub use self::log::SessionLog;
pub use queue::{delivery_queue, Delivery, DeliveryQueue, DeliverySender};

/// Log entry appended when the relay finishes
pub const SESSION_ENDED: &str = "🔚 Aider session ended.";

/// Advisory cancellation flag shared by the relay and its owner
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Relay tuning
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Pause when the stream is at EOF but the child is still alive
    pub idle_backoff: Duration,
    pub strip_carriage_returns: bool,
    /// Non-transient read errors tolerated in a row
    pub max_consecutive_read_errors: u32,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RelayOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            idle_backoff: config.idle_backoff(),
            strip_carriage_returns: config.strip_carriage_returns,
            max_consecutive_read_errors: config.max_consecutive_read_errors.max(1),
        }
    }
}

/// Why the relay loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// The stop signal was observed
    Stopped,
    /// End-of-stream with the child confirmed gone
    ChildExited(Option<i32>),
    /// The stream kept failing; treated as end-of-stream
    ReadFailed,
}

/// The producer side of a session
pub struct OutputRelay {
    source: Box<dyn OutputSource>,
    control: Arc<dyn ChildControl>,
    log: SessionLog,
    sender: DeliverySender,
    stop: StopSignal,
    options: RelayOptions,
}

impl OutputRelay {
    pub fn new(
        source: Box<dyn OutputSource>,
        control: Arc<dyn ChildControl>,
        log: SessionLog,
        sender: DeliverySender,
        stop: StopSignal,
        options: RelayOptions,
    ) -> Self {
        Self {
            source,
            control,
            log,
            sender,
            stop,
            options,
        }
    }

    /// Run the relay on a named background thread
    pub fn spawn(self) -> io::Result<RelayHandle> {
        let stop = self.stop.clone();
        let name = match self.control.pid() {
            Some(pid) => format!("aiderchat-relay-{}", pid),
            None => "aiderchat-relay".to_string(),
        };
        let join = thread::Builder::new().name(name).spawn(move || self.run())?;
        Ok(RelayHandle { join, stop })
    }

    /// Run the relay loop on the current thread until it finishes
    pub fn run(mut self) -> RelayExit {
        let mut assembler = LineAssembler::new(self.options.strip_carriage_returns);
        let mut consecutive_errors = 0u32;

        debug!("Relay started for pid {:?}", self.control.pid());

        let exit = loop {
            if self.stop.is_set() {
                break RelayExit::Stopped;
            }

            match self.source.read_char() {
                Ok(Some(c)) => {
                    consecutive_errors = 0;
                    if let Some(line) = assembler.push(c) {
                        self.publish(line);
                    }
                }
                Ok(None) => {
                    if let ProcessStatus::Exited(code) = self.control.poll() {
                        break RelayExit::ChildExited(code);
                    }
                    thread::sleep(self.options.idle_backoff);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "Relay read error ({}): {} (attempt {}/{})",
                        e.kind(),
                        e,
                        consecutive_errors,
                        self.options.max_consecutive_read_errors
                    );
                    if consecutive_errors >= self.options.max_consecutive_read_errors {
                        error!("Relay: too many consecutive read errors, treating as end of stream");
                        break RelayExit::ReadFailed;
                    }
                    thread::sleep(self.options.idle_backoff);
                }
            }
        };

        if let Some(partial) = assembler.take_partial() {
            debug!(target: "aiderchat::output", "{}", partial);
            self.log.append(partial, LineKind::Partial);
        }

        self.stop.set();
        self.log.append(SESSION_ENDED.to_string(), LineKind::Sentinel);
        info!("Relay finished: {:?}", exit);
        exit
    }

    fn publish(&self, line: String) {
        debug!(target: "aiderchat::output", "{}", line);
        self.log.append(line.clone(), LineKind::Output);
        // The log keeps the line even when nobody is draining the queue
        let _ = self.sender.push(line);
    }
}

/// Owner's handle on a running relay thread
#[derive(Debug)]
pub struct RelayHandle {
    join: JoinHandle<RelayExit>,
    stop: StopSignal,
}

impl RelayHandle {
    /// Raise the stop signal; takes effect at the relay's next check
    pub fn stop(&self) {
        self.stop.set();
    }

    /// Whether the relay thread has returned
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the relay thread; `None` if it panicked
    pub fn join(self) -> Option<RelayExit> {
        match self.join.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                error!("Relay thread panicked");
                None
            }
        }
    }
}
