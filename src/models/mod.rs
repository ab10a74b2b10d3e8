//! Core data models for aiderchat
//!
//! Log lines produced by the relay and the session status snapshot
//! exposed by the controller.

pub mod log_line;
pub mod session_state;

// Re-exports for convenience
pub use log_line::{LineKind, LogLine};
pub use session_state::{SessionState, SessionStatus};
