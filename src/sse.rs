//! Incremental decoding of an upstream `text/event-stream` body.
//!
//! Network chunks do not line up with SSE lines, so bytes are buffered until a
//! newline arrives. Decoding to UTF-8 happens per complete line, which keeps
//! multibyte characters that straddle two chunks intact.

/// Terminal sentinel used both upstream and downstream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed (without `\r\n` / `\n`).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let rest = self.buffer.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buffer, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&line);
        Some(text.trim_end_matches('\r').to_string())
    }
}

/// Payload of a `data:` line, trimmed. `None` for any other kind of line or an
/// empty payload.
pub fn data_payload(line: &str) -> Option<&str> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}
