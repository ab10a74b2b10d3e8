//! Session management
//!
//! A [`Session`] pairs one assistant process with the relay draining its
//! output. [`SessionController`] owns at most one of them at a time and
//! drives the IDLE/RUNNING lifecycle.

pub mod controller;

pub use controller::SessionController;

use std::process::ChildStdin;
use std::sync::Arc;

use crate::models::SessionStatus;
use crate::process::ProcessControl;
use crate::relay::RelayHandle;

/// The single live unit of work
#[derive(Debug)]
pub struct Session {
    /// Identity, timestamps and exit code
    pub status: SessionStatus,
    /// Write end of the child's input; `None` once closed
    pub stdin: Option<ChildStdin>,
    pub control: Arc<ProcessControl>,
    pub relay: RelayHandle,
}

impl Session {
    pub fn pid(&self) -> u32 {
        self.control.id()
    }

    /// Whether the relay thread has returned
    pub fn relay_finished(&self) -> bool {
        self.relay.is_finished()
    }
}
