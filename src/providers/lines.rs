//! Line framing for streamed upstream bodies
//!
//! Both upstream formats are line oriented (SSE and NDJSON). Lines are split
//! on raw bytes and only decoded once complete, so a code point split across
//! network chunks is never mangled.

#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk, returning every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// Take whatever trails the last newline once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_across_chunks() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"data: a").is_empty());
        assert_eq!(buf.push(b"bc\ndata: d\r\n\n"), vec!["data: abc", "data: d", ""]);
        assert!(buf.finish().is_none());
    }

    #[test]
    fn test_split_code_point() {
        let bytes = "data: é\n".as_bytes();
        let mut buf = LineBuffer::default();
        // "é" is two bytes; split between them
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        assert!(buf.push(&bytes[..split]).is_empty());
        assert_eq!(buf.push(&bytes[split..]), vec!["data: é"]);
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut buf = LineBuffer::default();
        buf.push(b"{\"done\":true}");
        assert_eq!(buf.finish().as_deref(), Some("{\"done\":true}"));
        assert!(buf.finish().is_none());
    }
}
