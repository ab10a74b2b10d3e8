//! Error types and Result aliases for aiderchat

use std::path::PathBuf;

/// Result type alias for aiderchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for aiderchat
///
/// Every variant is recoverable at the action boundary (start, send, stop).
/// None of them should take the host process down.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // === Process errors ===
    /// Spawning the assistant failed (binary missing, permission denied,
    /// bad working directory)
    #[error("Failed to launch '{command}': {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the assistant's stdin failed
    #[error("Failed to send input to the assistant: {source}")]
    SendFailed {
        #[source]
        source: std::io::Error,
    },

    /// Delivering a termination request failed
    #[error("Failed to terminate process {pid}: {reason}")]
    TerminateFailed { pid: u32, reason: String },

    // === Session errors ===
    /// Message was empty or whitespace-only
    #[error("Type something to send")]
    EmptyMessage,

    /// A session is already live on this controller
    #[error("A session is already running")]
    SessionAlreadyRunning,

    /// No session is live on this controller
    #[error("No session is running")]
    NoActiveSession,

    // === Configuration errors ===
    /// Required credential variable is not set
    #[error("Environment variable '{var}' is not set; it must hold the assistant's API key")]
    MissingCredential { var: String },

    /// Failed to load configuration file
    #[error("Failed to load config from '{}': {reason}", path.display())]
    ConfigLoadFailed { path: PathBuf, reason: String },

    /// Failed to parse configuration
    #[error("Failed to parse config '{}': {reason}", path.display())]
    ConfigParseFailed { path: PathBuf, reason: String },

    /// Configuration validation failed
    #[error("Configuration validation failed for '{field}': {reason}")]
    ConfigValidationFailed { field: String, reason: String },

    /// Failed to serialize configuration
    #[error("Failed to serialize config as {format}: {reason}")]
    ConfigSerializationFailed { format: String, reason: String },

    // === I/O and serialization errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is a user-input warning rather than a failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::EmptyMessage)
    }

    /// Whether this error prevents any session from starting
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential { .. }
                | Error::ConfigParseFailed { .. }
                | Error::ConfigValidationFailed { .. }
        )
    }
}

/// Render an error the way the front end shows it to the user
pub fn user_message(error: &Error) -> String {
    match error {
        Error::LaunchFailed { command, source } => {
            format!(
                "Failed to start the assistant ({}): {}\n\nTry:\n• Check that '{}' is installed and on PATH\n• Check the configured working directory",
                command, source, command
            )
        }
        Error::MissingCredential { var } => {
            format!(
                "Configuration Error: {} is not set\n\nTry:\n• export {}=<your key>\n• Restart aiderchat",
                var, var
            )
        }
        Error::SendFailed { .. } => {
            format!("{}\n\nThe assistant may have exited; check /status", error)
        }
        _ => error.to_string(),
    }
}
