use assistant_logging::{assistant_debug, assistant_info, assistant_warn};

use crate::attachments::{Attachment, AttachmentId, AttachmentStaging};
use crate::canvas::CanvasPayload;
use crate::document::DocumentExport;
use crate::effect::Effect;
use crate::protocol::{args_preview, BackendConfig, ChatRequest, HistoryEntry, StreamEvent};
use crate::render::CanvasSurface;
use crate::session::{SessionEnd, SessionId, SessionOutcome, SessionState};
use crate::tools::{FallbackToken, TimerCommand, ToolCallTracker};
use crate::transcript::{ImageRef, Role, Transcript};
use crate::view_model::{AppViewModel, AttachmentView};
use crate::voice::speech_text;

/// The explicitly owned client context: every surface the stream writes to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    input: String,
    transcript: Transcript,
    tools: ToolCallTracker,
    canvas: CanvasSurface,
    attachments: AttachmentStaging,
    session: SessionState,
    last_session_id: SessionId,
    last_outcome: Option<SessionOutcome>,
    config: BackendConfig,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            session: self.session,
            input: self.input.clone(),
            messages: self.transcript.messages().to_vec(),
            canvas: self.canvas.live().cloned(),
            tool: self.tools.phase(),
            attachments: self
                .attachments
                .entries()
                .iter()
                .map(|(id, attachment)| AttachmentView::new(*id, attachment))
                .collect(),
            config: self.config.clone(),
            last_outcome: self.last_outcome,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn is_session_active(&self) -> bool {
        matches!(self.session, SessionState::Active { .. })
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn canvas(&self) -> &CanvasSurface {
        &self.canvas
    }

    pub fn tools(&self) -> &ToolCallTracker {
        &self.tools
    }

    pub fn attachments(&self) -> &AttachmentStaging {
        &self.attachments
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.last_outcome
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, input: String) {
        if self.input != input {
            self.input = input;
            self.mark_dirty();
        }
    }

    pub(crate) fn is_current(&self, session_id: SessionId) -> bool {
        self.session == SessionState::Active { session_id }
    }

    pub(crate) fn active_session(&self) -> Option<SessionId> {
        match self.session {
            SessionState::Active { session_id } => Some(session_id),
            SessionState::Idle => None,
        }
    }

    pub(crate) fn stage_attachment(&mut self, attachment: Attachment) -> AttachmentId {
        self.mark_dirty();
        self.attachments.stage(attachment)
    }

    pub(crate) fn remove_attachment(&mut self, id: AttachmentId) {
        if self.attachments.remove(id).is_some() {
            self.mark_dirty();
        }
    }

    /// Appends the user turn and the in-progress agent message, drains the
    /// staged attachments, and returns the request to send.
    pub(crate) fn begin_session(&mut self) -> Option<(SessionId, ChatRequest)> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        if let Some(stuck) = self.transcript.in_progress() {
            assistant_warn!("message {} still in progress; refusing new session", stuck.id);
            return None;
        }

        let drained = self.attachments.drain();
        let mut message = text;
        for name in &drained.file_names {
            message.push_str(&format!("\n[Attached file: {name}]"));
        }
        let images = drained
            .images
            .iter()
            .map(|image| image.data_uri.clone())
            .collect();

        self.transcript.append_user(&message, drained.images);
        if let Err(err) = self.transcript.append_agent_placeholder() {
            assistant_warn!("could not open agent message: {}", err);
            return None;
        }

        self.last_session_id += 1;
        let session_id = self.last_session_id;
        self.session = SessionState::Active { session_id };
        self.input.clear();
        self.mark_dirty();
        Some((session_id, ChatRequest { message, images }))
    }

    pub(crate) fn apply_stream_event(&mut self, event: StreamEvent) -> Vec<Effect> {
        self.mark_dirty();
        let outcome = match event {
            StreamEvent::Thinking { content } => {
                self.transcript.set_status(Some(content)).map(|_| Vec::new())
            }
            StreamEvent::Content { content } => self
                .transcript
                .append_content_fragment(&content)
                .map(|_| Vec::new()),
            StreamEvent::ToolStart { tool, args } => Ok(self.tools.start(
                &mut self.transcript,
                &mut self.canvas,
                &tool,
                &args_preview(&args),
            )),
            StreamEvent::ToolEnd { output, .. } => {
                Ok(self.tools.finish(&mut self.transcript, &mut self.canvas, &output))
            }
            StreamEvent::CanvasUpdate { content } => {
                let rendered = self.canvas.render(CanvasPayload::from_value(content));
                assistant_debug!("canvas element {} {:?}", rendered.element_id, rendered.mode);
                Ok(self.tools.canvas_updated())
            }
            StreamEvent::Error { content } => self
                .transcript
                .append_error_annotation(&content)
                .map(|_| Vec::new()),
            StreamEvent::Done => Ok(Vec::new()),
        };
        match outcome {
            Ok(commands) => timer_effects(commands),
            Err(err) => {
                assistant_warn!("stream event dropped: {}", err);
                Vec::new()
            }
        }
    }

    /// Drives the session to its terminal state: closes tools, annotates
    /// failures, completes the in-progress message, and clears the active flag.
    pub(crate) fn end_session(&mut self, end: SessionEnd) -> Vec<Effect> {
        let mut effects = timer_effects(self.tools.close_session(&mut self.transcript, &mut self.canvas));

        let annotation = match &end {
            SessionEnd::Completed | SessionEnd::Aborted => None,
            SessionEnd::Unauthorized(detail) => Some(format!(
                "Unauthorized: {detail}. Sign in again before retrying."
            )),
            SessionEnd::NetworkError(detail) => Some(format!("Connection error: {detail}")),
        };
        if let Some(mut annotation) = annotation {
            if let Some(label) = self.config.context_label() {
                annotation.push_str(&format!(" ({label})"));
            }
            if let Err(err) = self.transcript.append_error_annotation(&annotation) {
                assistant_warn!("error annotation dropped: {}", err);
            }
        }

        let completed = match self.transcript.mark_completed() {
            Ok(id) => self.transcript.message(id).map(|message| message.text()),
            Err(err) => {
                assistant_warn!("no message to complete: {}", err);
                None
            }
        };

        let outcome = end.outcome();
        assistant_info!("session ended: {:?}", outcome);
        self.session = SessionState::Idle;
        self.last_outcome = Some(outcome);
        self.mark_dirty();

        if outcome == SessionOutcome::Completed {
            if let Some(text) = completed.map(|text| speech_text(&text)) {
                if !text.is_empty() {
                    effects.push(Effect::Speak { text });
                }
            }
        }
        effects
    }

    pub(crate) fn fallback_elapsed(&mut self, token: FallbackToken) {
        if self.tools.fallback_elapsed(&mut self.canvas, token) {
            self.mark_dirty();
        }
    }

    pub(crate) fn render_broadcast(&mut self, content: serde_json::Value) {
        self.canvas.render(CanvasPayload::from_value(content));
        self.mark_dirty();
    }

    pub(crate) fn dismiss_canvas(&mut self) {
        if self.canvas.is_visible() {
            self.canvas.hide();
            self.mark_dirty();
        }
    }

    pub(crate) fn canvas_export(&self) -> Option<DocumentExport> {
        self.canvas.export()
    }

    pub(crate) fn set_config(&mut self, config: BackendConfig) {
        self.config = config;
        self.mark_dirty();
    }

    pub(crate) fn set_provider(&mut self, provider: String, model: Option<String>) {
        let label = match &model {
            Some(model) => format!("{provider}/{model}"),
            None => provider.clone(),
        };
        self.config.provider = provider;
        self.config.model = model;
        self.transcript.append_system(&format!("Switched to {label}."));
        self.mark_dirty();
    }

    pub(crate) fn set_hybrid_routing(&mut self, enabled: bool) {
        self.config.hybrid_routing = enabled;
        self.mark_dirty();
    }

    /// Whole-history replacement from the backend's stored conversation.
    pub(crate) fn replay_history(&mut self, entries: Vec<HistoryEntry>) {
        let messages = entries
            .into_iter()
            .filter_map(|entry| {
                let role = match entry.role.as_str() {
                    "user" => Role::User,
                    "assistant" => Role::Agent,
                    "system" => Role::System,
                    _ => return None,
                };
                let (text, images) = entry.parts();
                if text.is_empty() && images.is_empty() {
                    return None;
                }
                Some((role, text, images.into_iter().map(ImageRef::new).collect()))
            })
            .collect();
        self.transcript.replace_all(messages);
        self.mark_dirty();
    }

    pub(crate) fn clear_history(&mut self) {
        self.transcript.clear();
        self.canvas.hide();
        self.mark_dirty();
    }

    pub(crate) fn append_notice(&mut self, text: &str) {
        self.transcript.append_system(text);
        self.mark_dirty();
    }
}

fn timer_effects(commands: Vec<TimerCommand>) -> Vec<Effect> {
    commands.into_iter().map(Effect::from).collect()
}
