use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the message input box.
    InputChanged(String),
    /// User submitted the current input (plus staged attachments).
    MessageSubmitted,
    /// User staged an image or file for the next turn.
    AttachmentStaged(crate::Attachment),
    /// User removed a staged attachment.
    AttachmentRemoved(crate::AttachmentId),
    /// One decoded event of a chat response stream, in arrival order.
    StreamEvent {
        session_id: crate::SessionId,
        event: crate::StreamEvent,
    },
    /// The chat response stream reached a terminal state.
    SessionEnded {
        session_id: crate::SessionId,
        end: crate::SessionEnd,
    },
    /// User asked to stop the running generation.
    AbortRequested,
    /// A tool placeholder fallback timer fired.
    ToolFallbackElapsed { token: crate::FallbackToken },
    /// Canvas payload broadcast outside a chat turn (e.g. the live monitor).
    CanvasBroadcast(Value),
    /// User clicked copy on the canvas card.
    CanvasCopyRequested,
    /// User clicked download on the canvas card.
    CanvasDownloadRequested,
    /// User closed the canvas.
    CanvasDismissed,
    ConfigRequested,
    ConfigLoaded(crate::BackendConfig),
    HistoryRequested,
    HistoryLoaded(Vec<crate::HistoryEntry>),
    /// User asked to wipe the conversation.
    ResetRequested,
    /// Backend confirmed the conversation was wiped.
    HistoryReset,
    ScreenshotRequested,
    /// Screenshot arrived as a data URI.
    ScreenshotCaptured(String),
    ProviderSwitchRequested {
        provider: String,
        model: Option<String>,
    },
    ProviderSwitched(crate::ProviderSelection),
    HybridRoutingToggled(bool),
    /// A side-channel call failed.
    ControlFailed { action: ControlAction, message: String },
}

/// Side-channel calls, for failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Config,
    History,
    Reset,
    Screenshot,
    SwitchProvider,
    HybridRouting,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::Config => write!(f, "loading configuration"),
            ControlAction::History => write!(f, "loading history"),
            ControlAction::Reset => write!(f, "clearing history"),
            ControlAction::Screenshot => write!(f, "capturing screenshot"),
            ControlAction::SwitchProvider => write!(f, "switching provider"),
            ControlAction::HybridRouting => write!(f, "updating hybrid routing"),
        }
    }
}
