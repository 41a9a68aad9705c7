//! Server-Sent Events decoding
//!
//! Incremental decoder turning raw response chunks into event payloads.
//! Chunk boundaries are arbitrary: a line, or a UTF-8 sequence, may be split
//! across two chunks.

/// Incremental SSE decoder.
///
/// Only `data:` fields are collected. `event:`, `id:` and `retry:` fields and
/// `:` comments are ignored. An event is dispatched on a blank line; multiple
/// `data:` lines of one event are joined with `\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the payloads of every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    events.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_ref(), ""),
            };

            if field == "data" {
                self.data_lines.push(value.to_string());
            }
        }

        events
    }

    /// Whether an event has started but not been dispatched.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || !self.data_lines.is_empty()
    }
}
