//! Log Line Model
//!
//! One entry of the session log: a completed line of the assistant's
//! output, a message the user sent, or the end-of-session marker.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(\x07|\x1b\\)|[@-Z\\-_])")
        .expect("ANSI escape pattern is valid")
});

/// How a log line came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Newline-terminated output
    Output,
    /// Unterminated output flushed when the relay stopped
    Partial,
    /// End-of-session marker
    Sentinel,
    /// A message the user sent to the assistant
    User,
}

/// A single entry in the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    /// Line content, newline stripped
    pub text: String,

    /// Position in the log, starting at 0
    pub sequence: usize,

    /// When the line was completed
    pub timestamp: DateTime<Utc>,

    pub kind: LineKind,
}

impl LogLine {
    /// Create a new log line
    pub fn new(text: String, sequence: usize, kind: LineKind) -> Self {
        Self {
            text,
            sequence,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Text with ANSI escape sequences removed
    pub fn plain_text(&self) -> String {
        strip_ansi(&self.text)
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind == LineKind::Sentinel
    }

    /// Whether the line came from the user rather than the assistant
    pub fn is_user(&self) -> bool {
        self.kind == LineKind::User
    }
}

impl std::fmt::Display for LogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Remove ANSI escape sequences (CSI, OSC and two-byte escapes)
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
