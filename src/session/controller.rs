//! Session Controller
//!
//! Owns the lifecycle of the assistant session:
//!
//! - `start`: launch the child and the relay, IDLE → RUNNING
//! - `send`: write one line to the child's input
//! - `stop`: halt the relay and terminate the child, RUNNING → IDLE
//!
//! The controller also notices when the relay has finished on its own
//! (the child exited) and drops back to IDLE on the next
//! [`SessionController::refresh`]. At most one child and one relay exist
//! per controller at a time.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::Session;
use crate::config::credentials::Credential;
use crate::config::{Config, RelayConfig};
use crate::error::{Error, Result};
use crate::models::{LineKind, LogLine, SessionState, SessionStatus};
use crate::process::{
    spawn_process, ChildControl, LaunchSpec, LaunchedProcess, ProcessStatus, Signal,
};
use crate::relay::{
    delivery_queue, CharReader, Delivery, DeliveryQueue, OutputRelay, RelayOptions, SessionLog,
    StopSignal,
};

/// Start/send/stop state machine over one assistant command line
pub struct SessionController {
    spec: LaunchSpec,
    relay_options: RelayOptions,
    poll_timeout: Duration,
    session: Option<Session>,
    /// Log of the current or most recent session
    log: SessionLog,
    /// Delivery queue of the current or most recent session
    queue: Option<DeliveryQueue>,
    /// Status of the most recent session once it has ended
    last_status: Option<SessionStatus>,
}

impl SessionController {
    pub fn new(spec: LaunchSpec, relay: &RelayConfig) -> Self {
        Self {
            spec,
            relay_options: RelayOptions::from(relay),
            poll_timeout: relay.poll_timeout(),
            session: None,
            log: SessionLog::new(),
            queue: None,
            last_status: None,
        }
    }

    /// Controller for the configured assistant
    pub fn from_config(config: &Config, credential: &Credential) -> Self {
        Self::new(config.assistant.launch_spec(credential), &config.relay)
    }

    /// The command line each session launches
    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Consumer poll timeout from the relay configuration
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Launch the assistant and its relay
    ///
    /// Rejected with [`Error::SessionAlreadyRunning`] while a session is
    /// live. On launch failure the controller stays IDLE and the previous
    /// session's log is kept.
    pub fn start(&mut self) -> Result<()> {
        if self.refresh() == SessionState::Running {
            return Err(Error::SessionAlreadyRunning);
        }

        let LaunchedProcess {
            stdin,
            output,
            control,
        } = spawn_process(&self.spec)?;

        let log = SessionLog::new();
        let (sender, queue) = delivery_queue();
        let stop = StopSignal::new();
        stop.clear();

        let relay = OutputRelay::new(
            Box::new(CharReader::new(output)),
            control.clone(),
            log.clone(),
            sender,
            stop,
            self.relay_options,
        );

        let relay = match relay.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to start relay thread: {}", e);
                drop(stdin);
                if let Err(term) = control.signal(Signal::Terminate) {
                    warn!("{}", term);
                }
                control.reap_in_background();
                return Err(Error::Io(e));
            }
        };

        let status = SessionStatus::started(Some(control.id()));
        info!("Session {} started (pid {})", status.id, control.id());

        self.log = log;
        self.queue = Some(queue);
        self.last_status = None;
        self.session = Some(Session {
            status,
            stdin: Some(stdin),
            control,
            relay,
        });
        Ok(())
    }

    /// Write `text` plus a newline to the assistant and flush
    ///
    /// Empty or whitespace-only text is rejected with
    /// [`Error::EmptyMessage`] before anything else is checked. A message
    /// that was written is recorded in the session log as a
    /// [`LineKind::User`] entry; a failed write records nothing.
    pub fn send(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        self.refresh();
        let session = self.session.as_mut().ok_or(Error::NoActiveSession)?;
        let stdin = session.stdin.as_mut().ok_or(Error::NoActiveSession)?;

        let written = writeln!(stdin, "{}", text).and_then(|()| stdin.flush());
        if let Err(source) = written {
            warn!("Send to pid {} failed: {}", session.pid(), source);
            self.refresh();
            return Err(Error::SendFailed { source });
        }

        debug!("Sent {} bytes to the assistant", text.len() + 1);
        self.log.append(text.to_string(), LineKind::User);
        Ok(())
    }

    /// Halt the relay and ask the child to exit
    ///
    /// Always ends IDLE. Calling it while IDLE does nothing. A failed
    /// termination request is reported after the transition; the child
    /// is still reaped in the background.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            debug!("Stop requested while idle");
            return Ok(());
        };

        session.relay.stop();
        drop(session.stdin.take());
        let result = session.control.signal(Signal::Terminate);

        let exit_code = match session.control.poll() {
            ProcessStatus::Exited(code) => code,
            ProcessStatus::Running => {
                Arc::clone(&session.control).reap_in_background();
                None
            }
        };

        session.status.mark_ended(exit_code);
        session.status.log_lines = self.log.len();
        info!("Session {} stopped", session.status.id);
        self.last_status = Some(session.status);

        // The relay thread is left to notice the stop signal on its own
        result
    }

    /// Deliver an interrupt to the assistant (cancels the reply in progress)
    pub fn interrupt(&mut self) -> Result<()> {
        self.refresh();
        let session = self.session.as_ref().ok_or(Error::NoActiveSession)?;
        session.control.signal(Signal::Interrupt)
    }

    /// Notice a relay that finished on its own and drop to IDLE
    pub fn refresh(&mut self) -> SessionState {
        if self.session.as_ref().is_some_and(Session::relay_finished) {
            if let Some(session) = self.session.take() {
                self.finish(session);
            }
        }
        self.state()
    }

    fn finish(&mut self, session: Session) {
        let Session {
            mut status,
            stdin,
            control,
            relay,
        } = session;
        drop(stdin);

        let exit_code = match control.poll() {
            ProcessStatus::Exited(code) => code,
            ProcessStatus::Running => {
                // The relay gave up on a child that is still alive
                if let Err(e) = control.signal(Signal::Terminate) {
                    warn!("{}", e);
                }
                control.reap_in_background();
                None
            }
        };

        if let Some(exit) = relay.join() {
            debug!("Relay for session {} ended: {:?}", status.id, exit);
        }

        status.mark_ended(exit_code);
        status.log_lines = self.log.len();
        info!("Session {} ended (exit code {:?})", status.id, exit_code);
        self.last_status = Some(status);
    }

    /// State as of the last start, stop or refresh
    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Status of the current session, or of the last one if IDLE
    pub fn status(&mut self) -> Option<SessionStatus> {
        self.refresh();
        let mut status = match &self.session {
            Some(session) => session.status.clone(),
            None => self.last_status.clone()?,
        };
        status.log_lines = self.log.len();
        Some(status)
    }

    /// Wait up to `timeout` for the next relayed line
    ///
    /// Once the relay is gone and the queue is drained this returns
    /// [`Delivery::Closed`], after waiting out `timeout` so that polling
    /// loops stay idle instead of spinning.
    pub async fn next_chunk(&mut self, timeout: Duration) -> Delivery {
        let delivery = match self.queue.as_mut() {
            Some(queue) => queue.next_chunk(timeout).await,
            None => Delivery::Closed,
        };
        if delivery == Delivery::Closed {
            tokio::time::sleep(timeout).await;
        }
        delivery
    }

    /// Next relayed line without waiting
    pub fn try_next_chunk(&mut self) -> Delivery {
        match self.queue.as_mut() {
            Some(queue) => queue.try_next(),
            None => Delivery::Closed,
        }
    }

    /// Every line that is ready for delivery right now
    pub fn drain_available(&mut self) -> Vec<String> {
        match self.queue.as_mut() {
            Some(queue) => queue.drain_available(),
            None => Vec::new(),
        }
    }

    /// Shared handle on the session log
    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn log_snapshot(&self) -> Vec<LogLine> {
        self.log.snapshot()
    }

    pub fn log_tail(&self, n: usize) -> Vec<LogLine> {
        self.log.tail(n)
    }

    /// Write the session log to `path` as JSON; returns the entry count
    pub fn export_log(&self, path: &Path) -> Result<usize> {
        let lines = self.log.snapshot();
        let json = serde_json::to_string_pretty(&lines)?;
        fs::write(path, json)?;
        info!("Exported {} log lines to {}", lines.len(), path.display());
        Ok(lines.len())
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop session on shutdown: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("spec", &self.spec)
            .field("state", &self.state())
            .field("log_lines", &self.log.len())
            .finish()
    }
}
