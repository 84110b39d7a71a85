//! Newline framing for the receive path
//!
//! Bytes arrive in arbitrary chunks; complete lines are handed out only once
//! their `\n` has been seen.

/// Longest line kept before it is flushed without a terminator
pub const MAX_LINE_LEN: usize = 1024;

/// Accumulates received bytes and splits them into lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered bytes not yet terminated
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Append received bytes and return every line they complete
    ///
    /// Lines are returned without the terminator; a trailing `\r` is
    /// stripped. Invalid UTF-8 is replaced rather than rejected.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in data {
            if byte == b'\n' {
                lines.push(self.take_line());
                continue;
            }
            self.buf.push(byte);
            if self.buf.len() >= MAX_LINE_LEN {
                tracing::warn!("Line exceeded {} bytes without terminator", MAX_LINE_LEN);
                lines.push(self.take_line());
            }
        }

        lines
    }

    fn take_line(&mut self) -> String {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_reads() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"OK:J1:9").is_empty());
        assert_eq!(buffer.pending_len(), 7);
        assert_eq!(buffer.push(b"0,J2:45\r\nERR"), vec!["OK:J1:90,J2:45"]);
        assert_eq!(buffer.push(b"OR:x\n\n"), vec!["ERROR:x", ""]);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_overlong_line_is_flushed() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(&vec![b'a'; MAX_LINE_LEN + 3]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_LINE_LEN);
        assert_eq!(buffer.pending_len(), 3);
    }
}
