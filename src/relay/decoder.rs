//! Character Decoder
//!
//! Turns the child's byte stream into `char`s one at a time. Reads are
//! buffered, decoding is lossy: each maximal invalid subpart of the input
//! becomes one U+FFFD, the same substitution `String::from_utf8_lossy`
//! makes. An overlong or surrogate encoding such as `ED A0 80` therefore
//! yields three replacements, not one.

use std::io::{self, BufRead, BufReader, Read};

/// Source of decoded characters for the relay
pub trait OutputSource: Send {
    /// Block until the next character is available
    ///
    /// `Ok(None)` means end-of-stream at this moment.
    fn read_char(&mut self) -> io::Result<Option<char>>;
}

/// Buffered UTF-8 decoder over any reader
pub struct CharReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> CharReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, reader),
        }
    }

    /// Look at the next byte without consuming it
    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.inner.consume(1);
        }
        Ok(byte)
    }

    /// Decode the next character
    pub fn next_char(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };

        // Width and the range allowed for the second byte, which rules out
        // overlong forms, surrogates and code points past U+10FFFF
        let (width, second) = match lead {
            0x00..=0x7F => return Ok(Some(lead as char)),
            0xC2..=0xDF => (2, 0x80..=0xBF),
            0xE0 => (3, 0xA0..=0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => (3, 0x80..=0xBF),
            0xED => (3, 0x80..=0x9F),
            0xF0 => (4, 0x90..=0xBF),
            0xF1..=0xF3 => (4, 0x80..=0xBF),
            0xF4 => (4, 0x80..=0x8F),
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };

        let mut code = u32::from(lead) & (0x7F >> width);
        for index in 1..width {
            let allowed = if index == 1 { second.clone() } else { 0x80..=0xBF };
            match self.peek_byte()? {
                Some(next) if allowed.contains(&next) => {
                    self.inner.consume(1);
                    code = (code << 6) | u32::from(next & 0x3F);
                }
                // The byte that broke the sequence is decoded next
                _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
            }
        }

        Ok(Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)))
    }
}

impl<R: Read + Send> OutputSource for CharReader<R> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        self.next_char()
    }
}
