//! Line framing for the upstream event stream.
//!
//! The upstream delivers newline-delimited frames where each complete line
//! of the form `data: <json>` carries one event, and `data: [DONE]` marks
//! end of stream. Byte chunks may split lines arbitrarily, so the parser
//! keeps the trailing unterminated remainder buffered across pushes.

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsePayload {
    /// The JSON text carried by one complete `data:` line.
    Data(String),
    /// The terminal sentinel; no further payloads follow.
    Done,
}

#[derive(Debug, Default)]
pub struct SseLineParser {
    // Byte buffer: a chunk boundary may fall inside a multi-byte character,
    // so decoding happens per completed line, not per chunk.
    buffer: Vec<u8>,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte chunk and drain every line completed by it.
    /// Lines without the `data: ` prefix are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SsePayload> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            if payload.trim() == DONE_SENTINEL {
                payloads.push(SsePayload::Done);
                break;
            }
            payloads.push(SsePayload::Data(payload.to_string()));
        }
        payloads
    }
}
