//! Process Launcher
//!
//! Starts a child with stdin piped and stdout/stderr sharing one pipe,
//! so the relay sees the two streams interleaved in emission order.

use std::collections::HashMap;
use std::fmt;
use std::io::PipeReader;
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::Arc;

use super::control::ProcessControl;
use crate::error::{Error, Result};

/// Arguments whose following value must never be logged
const SECRET_FLAGS: &[&str] = &["--api-key", "--openai-api-key", "--anthropic-api-key"];

/// A fully-resolved command line for the child
#[derive(Clone, PartialEq)]
pub struct LaunchSpec {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    working_directory: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            working_directory: None,
        }
    }

    /// Add an environment variable on top of the inherited environment
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_working_directory(mut self, dir: PathBuf) -> Self {
        self.working_directory = Some(dir);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Arguments with secret values masked, for logs and status output
    pub fn redacted_args(&self) -> Vec<String> {
        let mut redacted = Vec::with_capacity(self.args.len());
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                redacted.push("<redacted>".to_string());
                mask_next = false;
                continue;
            }
            if let Some((flag, _)) = arg.split_once('=') {
                if SECRET_FLAGS.contains(&flag) {
                    redacted.push(format!("{}=<redacted>", flag));
                    continue;
                }
            }
            mask_next = SECRET_FLAGS.contains(&arg.as_str());
            redacted.push(arg.clone());
        }
        redacted
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.redacted_args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchSpec")
            .field("program", &self.program)
            .field("args", &self.redacted_args())
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("working_directory", &self.working_directory)
            .finish()
    }
}

/// A running child split into the parts each owner needs
pub struct LaunchedProcess {
    /// Child's standard input, owned by the session
    pub stdin: ChildStdin,
    /// Read end of the merged stdout/stderr pipe, owned by the relay
    pub output: PipeReader,
    /// Shared lifecycle control
    pub control: Arc<ProcessControl>,
}

impl fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("pid", &self.control.id())
            .finish()
    }
}

/// Spawn the child described by `spec`
///
/// Fails with [`Error::LaunchFailed`] carrying the OS error when the
/// binary is missing, not executable, or the working directory is bad.
pub fn spawn_process(spec: &LaunchSpec) -> Result<LaunchedProcess> {
    let launch_error = |source: std::io::Error| Error::LaunchFailed {
        command: spec.program.clone(),
        source,
    };

    let (output, stdout_writer) = std::io::pipe().map_err(launch_error)?;
    let stderr_writer = stdout_writer.try_clone().map_err(launch_error)?;

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::piped())
        .stdout(stdout_writer)
        .stderr(stderr_writer);

    if let Some(dir) = &spec.working_directory {
        command.current_dir(dir);
    }

    info!("Spawning {}", spec);
    let spawned = command.spawn();
    // The parent's copies of the write end live in `command`; EOF only
    // reaches the reader once they are closed.
    drop(command);
    let mut child = spawned.map_err(launch_error)?;

    let stdin = match child.stdin.take() {
        Some(stdin) => stdin,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(launch_error(std::io::Error::other("stdin was not captured")));
        }
    };

    let control = Arc::new(ProcessControl::new(child));
    debug!("Assistant started with pid {}", control.id());

    Ok(LaunchedProcess {
        stdin,
        output,
        control,
    })
}
