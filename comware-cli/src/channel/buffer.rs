//! Pattern buffer with tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. `display current-configuration` on a
//! stacked chassis easily runs to megabytes, so this matters.

use std::fmt;

use bytes::BytesMut;
use vte::{Parser, Perform};

/// Buffer for accumulating device output and searching it for patterns.
///
/// ANSI escape sequences are removed as data arrives. The escape parser
/// keeps its state between calls, so a sequence split across two reads is
/// still stripped.
pub struct PatternBuffer {
    /// The accumulated (cleaned) output.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape sequence parser.
    parser: Parser,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut sink = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut sink, data);
    }

    /// The last `search_depth` bytes of the buffer, starting no earlier than `from`.
    pub fn tail_from(&self, from: usize) -> &[u8] {
        let start = self
            .buffer
            .len()
            .saturating_sub(self.search_depth)
            .max(from.min(self.buffer.len()));
        &self.buffer[start..]
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

/// Keeps printable characters and line-layout controls, drops everything else.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"<Switch>");
        assert_eq!(buffer.tail_from(0), b"<Switch>");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m\r\n");
        assert_eq!(buffer.tail_from(0), b"Green text\r\n");
    }

    #[test]
    fn test_split_escape_sequence() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"abc\x1b[1");
        buffer.extend(b"6Ddef");
        assert_eq!(buffer.tail_from(0), b"abcdef");
    }

    #[test]
    fn test_invalid_utf8_is_substituted() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"a\xffb");
        let text = String::from_utf8_lossy(buffer.tail_from(0)).into_owned();
        assert!(text.starts_with('a'));
        assert!(text.ends_with('b'));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\r\n<Switch>");

        let pattern = Regex::new(r"<Switch>").unwrap();
        assert!(pattern.is_match(buffer.tail_from(0)));
        assert_eq!(buffer.tail_from(0).len(), 20);
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"<Switch>");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"<Switch>").unwrap();
        assert!(!pattern.is_match(buffer.tail_from(0)));
    }

    #[test]
    fn test_tail_from_mark() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Password:");
        let mark = buffer.len();
        buffer.extend(b"\r\n<Switch>");
        assert_eq!(buffer.tail_from(mark), b"\r\n<Switch>");
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.is_empty());
    }
}
