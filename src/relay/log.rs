//! Session Log
//!
//! Append-only record of a session: the assistant's output as written by
//! the relay, interleaved with the messages the user sent. The display
//! side takes snapshots.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{LineKind, LogLine};

/// Shared, append-only session log
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    lines: Arc<RwLock<Vec<LogLine>>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<LogLine>> {
        self.lines.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<LogLine>> {
        self.lines.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a line and return the stored entry
    pub fn append(&self, text: String, kind: LineKind) -> LogLine {
        let mut lines = self.write();
        let line = LogLine::new(text, lines.len(), kind);
        lines.push(line.clone());
        line
    }

    /// Copy of every entry
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.read().clone()
    }

    /// Text of every entry, in order
    pub fn texts(&self) -> Vec<String> {
        self.read().iter().map(|line| line.text.clone()).collect()
    }

    /// The last `n` entries
    pub fn tail(&self, n: usize) -> Vec<LogLine> {
        let lines = self.read();
        let start = lines.len().saturating_sub(n);
        lines[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether the end-of-session marker has been written
    ///
    /// A message sent just before the child exited can land after it.
    pub fn has_ended(&self) -> bool {
        self.read().iter().rev().any(LogLine::is_sentinel)
    }
}
