use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the chat stream for a new session.
    SendChat {
        session_id: crate::SessionId,
        request: crate::ChatRequest,
    },
    AbortStream { session_id: crate::SessionId },
    ArmToolFallback {
        token: crate::FallbackToken,
        delay: Duration,
    },
    CancelToolFallback { token: crate::FallbackToken },
    /// Speak a completed agent reply.
    Speak { text: String },
    CopyToClipboard(crate::DocumentExport),
    SaveDocument(crate::DocumentExport),
    FetchConfig,
    FetchHistory,
    ResetHistory,
    CaptureScreenshot,
    SwitchProvider {
        provider: String,
        model: Option<String>,
    },
    SetHybridRouting(bool),
}

impl From<crate::TimerCommand> for Effect {
    fn from(command: crate::TimerCommand) -> Self {
        match command {
            crate::TimerCommand::Arm { token, delay } => Effect::ArmToolFallback { token, delay },
            crate::TimerCommand::Cancel { token } => Effect::CancelToolFallback { token },
        }
    }
}
