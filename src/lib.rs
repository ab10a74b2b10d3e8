//! aiderchat - a chat-style terminal front end for aider
//!
//! This library launches an interactive assistant as a child process,
//! relays its output line by line, and forwards user messages to its
//! standard input.
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration loading, assistant command line, credentials
//! - [`process`] - Child launch with merged stdout/stderr, signals, reaping
//! - [`relay`] - Output relay thread, line assembly, session log, delivery queue
//! - [`session`] - Start/send/stop session controller
//! - [`models`] - Log lines and session status
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use aiderchat::{Config, Credential, Delivery, SessionController};
//! use std::time::Duration;
//!
//! # async fn run() -> aiderchat::Result<()> {
//! let config = Config::default();
//! let credential = Credential::from_env(&config.assistant.credential_env)?;
//!
//! let mut controller = SessionController::from_config(&config, &credential);
//! controller.start()?;
//! controller.send("/help")?;
//!
//! while let Delivery::Line(line) = controller.next_chunk(Duration::from_millis(100)).await {
//!     println!("{}", line);
//! }
//! controller.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Relay Thread:** One per session; blocking char-at-a-time reads of the
//!   child's merged output, publishing completed lines
//! - **Foreground:** Issues start/send/stop and drains the delivery queue
//!   with a short timeout
//!
//! The relay hands lines over through an unbounded `tokio::mpsc` channel
//! and appends them to a shared `RwLock`-guarded log.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod models;
pub mod process;
pub mod relay;
pub mod session;

// Re-exports for core functionality
pub use config::credentials::Credential;
pub use config::loader::ConfigLoader;
pub use config::Config;
pub use error::{Error, Result};
pub use models::{LineKind, LogLine, SessionState, SessionStatus};
pub use relay::{Delivery, SESSION_ENDED};
pub use session::SessionController;

/// The current version of aiderchat from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load configuration from an explicit file, or from the search paths
///
/// An explicit path that does not exist or fails to parse is an error.
pub fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = ConfigLoader::load_from_file(path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => ConfigLoader::load(),
    }
}
