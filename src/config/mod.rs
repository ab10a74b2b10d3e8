//! Configuration management for aiderchat
//!
//! This module provides configuration for the wrapped assistant command
//! line, the output relay, and logging, plus loading/saving through
//! [`loader::ConfigLoader`] and credential lookup through [`credentials`].

pub mod credentials;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::process::LaunchSpec;
use credentials::Credential;

/// Main configuration structure for aiderchat
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Wrapped assistant command line
    pub assistant: AssistantConfig,

    /// Output relay and display tuning
    pub relay: RelayConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Assistant launch configuration
///
/// The defaults reproduce the fixed aider invocation: architect mode with
/// auto-accept, `--yes-always`, no auto-commits and no auto-test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Assistant executable
    pub binary: String,

    /// Model name passed with `--model`
    pub model: String,

    /// Environment variable holding the API key
    pub credential_env: String,

    /// Provider prefix for `--api-key <provider>=<key>`
    pub credential_provider: String,

    /// `--auto-commits` when true, `--no-auto-commits` otherwise
    pub auto_commits: bool,

    /// `--architect`
    pub architect: bool,

    /// `--auto-accept-architect`
    pub auto_accept_architect: bool,

    /// `--yes-always`
    pub yes_always: bool,

    /// `--auto-test` when true, `--no-auto-test` otherwise
    pub auto_test: bool,

    /// Extra arguments appended after the fixed flags
    pub extra_args: Vec<String>,

    /// Working directory for the assistant (current directory if unset)
    pub working_directory: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            binary: "aider".to_string(),
            model: "o3-mini".to_string(),
            credential_env: "OPENAI_API_KEY".to_string(),
            credential_provider: "openai".to_string(),
            auto_commits: false,
            architect: true,
            auto_accept_architect: true,
            yes_always: true,
            auto_test: false,
            extra_args: Vec::new(),
            working_directory: None,
        }
    }
}

impl AssistantConfig {
    /// Build the argument list for the assistant, credential included
    pub fn build_args(&self, credential: &Credential) -> Vec<String> {
        let mut args = vec![
            "--model".to_string(),
            self.model.clone(),
            "--api-key".to_string(),
            format!("{}={}", self.credential_provider, credential.expose()),
        ];

        if self.auto_accept_architect {
            args.push("--auto-accept-architect".to_string());
        }
        args.push(if self.auto_commits {
            "--auto-commits".to_string()
        } else {
            "--no-auto-commits".to_string()
        });
        if self.yes_always {
            args.push("--yes-always".to_string());
        }
        if self.architect {
            args.push("--architect".to_string());
        }
        args.push(if self.auto_test {
            "--auto-test".to_string()
        } else {
            "--no-auto-test".to_string()
        });

        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Turn this configuration into a launchable command
    pub fn launch_spec(&self, credential: &Credential) -> LaunchSpec {
        // Python buffers stdout on pipes; the relay needs it line by line
        let mut spec = LaunchSpec::new(&self.binary, self.build_args(credential))
            .with_env("PYTHONUNBUFFERED", "1");
        if let Some(dir) = &self.working_directory {
            spec = spec.with_working_directory(dir.clone());
        }
        spec
    }
}

/// Output relay and display configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// How long the display consumer waits for the next line
    pub poll_timeout_ms: u64,

    /// Number of trailing log lines shown by the display
    pub log_tail_lines: usize,

    /// Pause between polls when the stream is at EOF but the child lives
    pub idle_backoff_ms: u64,

    /// Drop a `\r` that directly precedes `\n`
    pub strip_carriage_returns: bool,

    /// Read errors tolerated in a row before the relay gives up
    pub max_consecutive_read_errors: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 100,
            log_tail_lines: 100,
            idle_backoff_ms: 10,
            strip_carriage_returns: true,
            max_consecutive_read_errors: 5,
        }
    }
}

impl RelayConfig {
    pub fn poll_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn idle_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
