//! Assistant Process Management
//!
//! Spawning the assistant with piped stdin and a merged stdout/stderr
//! stream, plus lifecycle control (poll, terminate, interrupt, reap).

pub mod control;
pub mod launcher;

// Re-exports for convenience
pub use control::{ChildControl, ProcessControl, ProcessStatus, Signal};
pub use launcher::{spawn_process, LaunchSpec, LaunchedProcess};
