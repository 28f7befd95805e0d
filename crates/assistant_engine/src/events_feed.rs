//! Server-sent-events framing for the backend's broadcast feed.

use std::sync::Arc;
use std::time::Duration;

use assistant_core::Msg;
use assistant_logging::{assistant_debug, assistant_info, assistant_warn};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::transport::AssistantBackend;
use crate::FailureKind;

pub const FEED_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Broadcast {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Value,
}

/// Splits an `text/event-stream` body into events and keeps the canvas
/// payloads. Other broadcast types are logged and skipped.
#[derive(Debug, Default)]
pub struct EventFeedDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl EventFeedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            if let Some(payload) = self.line(line.trim_end_matches('\r')) {
                payloads.push(payload);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        payloads
    }

    fn line(&mut self, line: &str) -> Option<Value> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            self.data
                .push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<Value> {
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        match serde_json::from_str::<Broadcast>(&data) {
            Ok(broadcast) if broadcast.kind == "canvas_update" => Some(broadcast.content),
            Ok(broadcast) => {
                assistant_debug!("ignoring '{}' broadcast", broadcast.kind);
                None
            }
            Err(err) => {
                assistant_warn!("dropping malformed broadcast: {}", err);
                None
            }
        }
    }
}

/// Forwards canvas broadcasts into the driver inbox until `shutdown`,
/// reconnecting after a delay when the feed drops.
pub async fn forward_broadcasts(
    backend: Arc<dyn AssistantBackend>,
    inbox: UnboundedSender<Msg>,
    shutdown: CancellationToken,
) {
    loop {
        let opened = tokio::select! {
            _ = shutdown.cancelled() => return,
            opened = backend.open_events() => opened,
        };
        match opened {
            Ok(mut body) => {
                assistant_info!("event feed connected");
                let mut decoder = EventFeedDecoder::new();
                loop {
                    let chunk = tokio::select! {
                        _ = shutdown.cancelled() => return,
                        chunk = body.next() => chunk,
                    };
                    match chunk {
                        Some(Ok(bytes)) => {
                            for payload in decoder.push(&bytes) {
                                if inbox.send(Msg::CanvasBroadcast(payload)).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(err)) => {
                            assistant_warn!("event feed broke: {}", err);
                            break;
                        }
                        None => {
                            assistant_info!("event feed closed by backend");
                            break;
                        }
                    }
                }
            }
            Err(err) if err.kind == FailureKind::Unsupported => {
                assistant_debug!("backend has no event feed");
                return;
            }
            Err(err) => assistant_warn!("event feed unavailable: {}", err),
        }
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(FEED_RETRY_DELAY) => {}
        }
    }
}
