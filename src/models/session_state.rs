//! Session State Model
//!
//! The controller's two-state lifecycle and the status snapshot it
//! reports to the display layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// No child process and no relay
    #[default]
    Idle,
    /// One child process with its relay
    Running,
}

/// Point-in-time view of the current or most recent session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session identifier
    pub id: Uuid,

    /// Current state of the controller
    pub state: SessionState,

    /// OS process identifier of the assistant
    pub pid: Option<u32>,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// When the session ended (if it has)
    pub ended_at: Option<DateTime<Utc>>,

    /// Exit code once the child has been reaped
    pub exit_code: Option<i32>,

    /// Lines in the session log, sentinel included
    pub log_lines: usize,
}

impl SessionStatus {
    /// Status of a session that has just started
    pub fn started(pid: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Running,
            pid,
            started_at: Utc::now(),
            ended_at: None,
            exit_code: None,
            log_lines: 0,
        }
    }

    /// Mark the session as ended
    pub fn mark_ended(&mut self, exit_code: Option<i32>) {
        self.state = SessionState::Idle;
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
        if exit_code.is_some() {
            self.exit_code = exit_code;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running)
    }

    /// Session duration, up to now if still running
    pub fn duration(&self) -> std::time::Duration {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        end.signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Get a display string for the session
    pub fn display_string(&self) -> String {
        let state_str = match self.state {
            SessionState::Idle => "Idle",
            SessionState::Running => "Running",
        };

        let pid_str = self.pid.map_or("N/A".to_string(), |pid| pid.to_string());

        format!(
            "session {} [{}] - {} - {} lines{}",
            self.id,
            pid_str,
            state_str,
            self.log_lines,
            self.exit_code
                .map_or(String::new(), |code| format!(" (exit: {})", code))
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_string())
    }
}
