//! Chunk to line reassembly
//!
//! The controller's output arrives in arbitrary pieces. Bytes are buffered
//! until a newline shows up, so multi-byte characters split across chunks
//! decode correctly. A line that outgrows [`MAX_LINE_LEN`] is dropped up to
//! its terminating newline.

/// Longest unterminated line kept in the buffer
pub const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into trimmed, non-empty lines
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
    /// Dropping the remainder of an over-long line
    discarding: bool,
}

impl LineSplitter {
    /// Create an empty splitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<String> {
        if self.discarding {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    chunk = &chunk[pos + 1..];
                }
                None => return Vec::new(),
            }
        }
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        if self.pending.len() > MAX_LINE_LEN {
            tracing::warn!(
                "Dropping {} bytes of controller output without a line ending",
                self.pending.len()
            );
            self.pending.clear();
            self.discarding = true;
        }
        lines
    }

    /// Take whatever partial line is buffered, e.g. when the stream closed
    pub fn flush(&mut self) -> Option<String> {
        self.discarding = false;
        let raw = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"o").is_empty());
        assert_eq!(splitter.push(b"k\r\n[PRB:1.0,2"), vec!["ok"]);
        assert_eq!(splitter.push(b".0,3.0:1]\n"), vec!["[PRB:1.0,2.0,3.0:1]"]);
        assert_eq!(splitter.flush(), None);
    }

    #[test]
    fn test_runaway_line_is_dropped() {
        let mut splitter = LineSplitter::new();
        let noise = vec![b'x'; 1000];
        for _ in 0..5 {
            assert!(splitter.push(&noise).is_empty());
        }
        assert_eq!(splitter.flush(), None);

        for _ in 0..5 {
            assert!(splitter.push(&noise).is_empty());
        }
        assert!(splitter.push(b"tail of the junk").is_empty());
        assert_eq!(splitter.push(b"xx\nok\nerror:9\n"), vec!["ok", "error:9"]);
    }

    #[test]
    fn test_long_line_under_limit_survives() {
        let mut splitter = LineSplitter::new();
        let body = format!("[MSG:{}]", "a".repeat(MAX_LINE_LEN - 16));
        for piece in body.as_bytes().chunks(512) {
            assert!(splitter.push(piece).is_empty());
        }
        assert_eq!(splitter.push(b"\n"), vec![body]);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let mut splitter = LineSplitter::new();
        assert_eq!(
            splitter.push(b"\r\n  \nok\n\nerror:9\n"),
            vec!["ok", "error:9"]
        );
    }

    #[test]
    fn test_multibyte_split() {
        let mut splitter = LineSplitter::new();
        let text = "[MSG:3µs]\n".as_bytes();
        let (a, b) = text.split_at(7);
        assert!(splitter.push(a).is_empty());
        assert_eq!(splitter.push(b), vec!["[MSG:3µs]"]);
    }

    #[test]
    fn test_flush() {
        let mut splitter = LineSplitter::new();
        splitter.push(b"ok\nGrblHAL 1.1f");
        assert_eq!(splitter.flush().as_deref(), Some("GrblHAL 1.1f"));
        assert_eq!(splitter.flush(), None);
    }
}
