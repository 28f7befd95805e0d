//! Newline-delimited JSON framing for the chat response body.

use assistant_core::StreamEvent;
use assistant_logging::{assistant_debug, assistant_warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed event: {0}")]
    Json(#[from] serde_json::Error),
}

/// Carries the partial trailing line across chunk boundaries. Bytes are
/// buffered, so a multi-byte character split between chunks survives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    dropped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every event completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let end = start + offset;
            match decode_line(&self.buffer[start..end]) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(err) => {
                    self.dropped += 1;
                    assistant_warn!("dropping stream line: {}", err);
                }
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        events
    }

    /// End of input. An unterminated trailing line is incomplete and discarded.
    pub fn finish(&mut self) -> usize {
        let leftover = self.buffer.len();
        if leftover > 0 {
            assistant_debug!("discarding {} bytes of unterminated stream data", leftover);
            self.buffer.clear();
        }
        leftover
    }

    /// Lines dropped as malformed so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Parses one complete line. Blank lines carry no event.
pub fn decode_line(line: &[u8]) -> Result<Option<StreamEvent>, DecodeError> {
    let text = std::str::from_utf8(line)?.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}
