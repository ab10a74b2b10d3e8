//! Line Assembly
//!
//! Accumulates characters until a newline and hands back the finished
//! line with only the newline removed.

/// Character accumulator for one output stream
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: String,
    strip_carriage_returns: bool,
}

impl LineAssembler {
    pub fn new(strip_carriage_returns: bool) -> Self {
        Self {
            buffer: String::new(),
            strip_carriage_returns,
        }
    }

    /// Feed one character; returns the completed line on `\n`
    pub fn push(&mut self, c: char) -> Option<String> {
        if c != '\n' {
            self.buffer.push(c);
            return None;
        }

        let mut line = std::mem::take(&mut self.buffer);
        if self.strip_carriage_returns && line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Feed a string, collecting every line it completes
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        text.chars().filter_map(|c| self.push(c)).collect()
    }

    /// Take the unterminated remainder, if any
    pub fn take_partial(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Characters waiting for a newline
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}
