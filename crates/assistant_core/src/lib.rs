//! Assistant core: the pure client state machine for a streamed agent chat.
//!
//! Everything here is synchronous and side-effect free. Stream events,
//! timer firings and user actions arrive as [`Msg`] values; [`update`]
//! returns the new [`AppState`] plus the [`Effect`]s the host must run.
mod attachments;
pub mod canvas;
mod document;
mod effect;
mod msg;
mod protocol;
mod render;
mod session;
mod state;
mod tools;
mod transcript;
mod update;
mod view_model;
pub mod voice;

pub use attachments::{Attachment, AttachmentId, AttachmentKind, AttachmentStaging, DrainedAttachments};
pub use canvas::{CanvasPayload, RenderError};
pub use document::{BodyFormat, DocumentExport};
pub use effect::Effect;
pub use msg::{ControlAction, Msg};
pub use protocol::{
    args_preview, BackendConfig, ChatRequest, HistoryEntry, ProviderSelection, StreamEvent,
    ToolOutput,
};
pub use render::{
    CanvasCard, CanvasOrigin, CanvasSurface, ElementId, HudFields, LiveCanvas, RenderMode,
    Rendered, ResultLink,
};
pub use session::{SessionEnd, SessionId, SessionOutcome, SessionState};
pub use state::AppState;
pub use tools::{
    preview, FallbackToken, TimerCommand, ToolCallTracker, ToolPhase,
    TOOL_FALLBACK_DELAY, TOOL_OUTPUT_PREVIEW_CHARS,
};
pub use transcript::{
    Block, CardRef, ImageRef, Message, MessageId, Role, ToolCard, ToolCardState, Transcript,
    TranscriptError,
};
pub use update::update;
pub use view_model::{AppViewModel, AttachmentView};
pub use voice::{select_voice, speech_text, VoiceDescriptor, VoicePreferences};
