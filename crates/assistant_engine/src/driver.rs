use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assistant_core::{
    select_voice, update, AppState, AppViewModel, ChatRequest, ControlAction, DocumentExport,
    Effect, FallbackToken, Msg, SessionEnd, SessionId, SessionOutcome, VoiceDescriptor,
    VoicePreferences,
};
use assistant_logging::{assistant_debug, assistant_info, assistant_warn};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::affordance::{copy_document, Clipboard, CopyOutcome, DocumentSaver};
use crate::frame::FrameDecoder;
use crate::transport::AssistantBackend;
use crate::voice_wait::{resolve_voice, VoiceCatalog, VoicePollSettings};
use crate::TransportError;

#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Replaces the delay requested by the core for tool placeholders.
    pub tool_fallback_delay: Option<Duration>,
    pub download_dir: PathBuf,
    pub voice_poll: VoicePollSettings,
    pub voice_preferences: VoicePreferences,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            tool_fallback_delay: None,
            download_dir: PathBuf::from("downloads"),
            voice_poll: VoicePollSettings::default(),
            voice_preferences: VoicePreferences::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a reply is still streaming")]
    SessionActive,
    #[error("message is empty")]
    EmptyMessage,
    #[error("message was not sent")]
    NotStarted,
}

/// Surfaces the driver writes to outside the state machine.
pub trait ChatHost: Send {
    /// Called after every update that changed visible state.
    fn render(&mut self, view: &AppViewModel);
    fn speak(&mut self, voice: Option<&VoiceDescriptor>, text: &str);
    fn clipboard(&mut self) -> &mut dyn Clipboard;
    /// Short, non-fatal status line (copy result, saved path, ...).
    fn notify(&mut self, text: &str);
}

/// Owns the client state and executes the effects it asks for.
///
/// Messages from other tasks (user input, broadcast feed, abort) arrive
/// through the inbox and are interleaved with an active stream on one loop.
/// Effects that need their own round trip (control calls, speech) are
/// deferred until the stream ends.
pub struct ChatDriver<H: ChatHost> {
    state: AppState,
    backend: Arc<dyn AssistantBackend>,
    host: H,
    settings: DriverSettings,
    saver: DocumentSaver,
    voices: Option<Box<dyn VoiceCatalog>>,
    catalog_polled: bool,
    pending: VecDeque<Msg>,
    deferred: VecDeque<Effect>,
    fallback: Option<(FallbackToken, Instant)>,
    abort: Option<CancellationToken>,
    shutdown: CancellationToken,
    inbox_tx: mpsc::UnboundedSender<Msg>,
    inbox: mpsc::UnboundedReceiver<Msg>,
}

impl<H: ChatHost> ChatDriver<H> {
    pub fn new(backend: Arc<dyn AssistantBackend>, host: H, settings: DriverSettings) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(),
            backend,
            host,
            saver: DocumentSaver::new(settings.download_dir.clone()),
            settings,
            voices: None,
            catalog_polled: false,
            pending: VecDeque::new(),
            deferred: VecDeque::new(),
            fallback: None,
            abort: None,
            shutdown: CancellationToken::new(),
            inbox_tx,
            inbox,
        }
    }

    pub fn with_voice_catalog(mut self, catalog: Box<dyn VoiceCatalog>) -> Self {
        self.voices = Some(catalog);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Sender for messages produced outside the driver.
    pub fn sender(&self) -> mpsc::UnboundedSender<Msg> {
        self.inbox_tx.clone()
    }

    /// Cancelling this ends [`ChatDriver::run`] and aborts any active session.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Processes inbox messages until shutdown.
    pub async fn run(&mut self) {
        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                msg = self.inbox.recv() => msg,
            };
            match msg {
                Some(msg) => self.dispatch(msg).await,
                None => break,
            }
        }
        assistant_info!("driver stopped");
    }

    /// Applies `msg` and runs every effect it causes, including a whole chat
    /// session when one is started.
    pub async fn dispatch(&mut self, msg: Msg) {
        self.pending.push_back(msg);
        self.pump().await;
    }

    /// Sends `text` with the staged attachments and waits for the session to end.
    pub async fn submit(&mut self, text: &str) -> Result<SessionOutcome, SubmitError> {
        if self.state.is_session_active() {
            return Err(SubmitError::SessionActive);
        }
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        let before = self.state.transcript().len();
        self.dispatch(Msg::InputChanged(text.to_string())).await;
        self.dispatch(Msg::MessageSubmitted).await;
        if self.state.transcript().len() == before {
            return Err(SubmitError::NotStarted);
        }
        self.state.last_outcome().ok_or(SubmitError::NotStarted)
    }

    async fn pump(&mut self) {
        loop {
            if let Some(effect) = self.deferred.pop_front() {
                self.execute(effect).await;
                continue;
            }
            let Some(msg) = self.pending.pop_front() else {
                break;
            };
            let effects = self.apply(msg);
            self.deferred.extend(effects);
        }
    }

    fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.host.render(&state.view());
        }
        self.state = state;
        effects
    }

    /// Applies a message arriving mid-session. Only effects that can run
    /// without leaving the stream loop are executed now.
    fn feed(&mut self, msg: Msg) {
        for effect in self.apply(msg) {
            self.execute_local(effect);
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::SendChat {
                session_id,
                request,
            } => self.run_session(session_id, request).await,
            Effect::Speak { text } => self.speak(&text).await,
            Effect::FetchConfig => {
                let msg = match self.backend.fetch_config().await {
                    Ok(config) => Msg::ConfigLoaded(config),
                    Err(err) => failed(ControlAction::Config, err),
                };
                self.pending.push_back(msg);
            }
            Effect::SetHybridRouting(enabled) => {
                if let Err(err) = self.backend.set_hybrid_routing(enabled).await {
                    self.pending.push_back(failed(ControlAction::HybridRouting, err));
                }
            }
            Effect::FetchHistory => {
                let msg = match self.backend.fetch_history().await {
                    Ok(entries) => Msg::HistoryLoaded(entries),
                    Err(err) => failed(ControlAction::History, err),
                };
                self.pending.push_back(msg);
            }
            Effect::ResetHistory => {
                let msg = match self.backend.reset_history().await {
                    Ok(()) => Msg::HistoryReset,
                    Err(err) => failed(ControlAction::Reset, err),
                };
                self.pending.push_back(msg);
            }
            Effect::CaptureScreenshot => {
                let msg = match self.backend.capture_screenshot().await {
                    Ok(data_uri) => Msg::ScreenshotCaptured(data_uri),
                    Err(err) => failed(ControlAction::Screenshot, err),
                };
                self.pending.push_back(msg);
            }
            Effect::SwitchProvider { provider, model } => {
                let msg = match self
                    .backend
                    .switch_provider(&provider, model.as_deref())
                    .await
                {
                    Ok(selection) => Msg::ProviderSwitched(selection),
                    Err(err) => failed(ControlAction::SwitchProvider, err),
                };
                self.pending.push_back(msg);
            }
            other => self.execute_local(other),
        }
    }

    fn execute_local(&mut self, effect: Effect) {
        match effect {
            Effect::ArmToolFallback { token, delay } => {
                let delay = self.settings.tool_fallback_delay.unwrap_or(delay);
                assistant_debug!("arming fallback {} for {:?}", token.value(), delay);
                self.fallback = Some((token, Instant::now() + delay));
            }
            Effect::CancelToolFallback { token } => {
                if self.fallback.is_some_and(|(armed, _)| armed == token) {
                    assistant_debug!("fallback {} cancelled", token.value());
                    self.fallback = None;
                }
            }
            Effect::AbortStream { session_id } => match &self.abort {
                Some(abort) => {
                    assistant_info!("abort requested for session {}", session_id);
                    abort.cancel();
                }
                None => assistant_debug!("abort for session {} with no stream open", session_id),
            },
            Effect::CopyToClipboard(document) => self.copy(&document),
            Effect::SaveDocument(document) => self.save(&document),
            other => self.deferred.push_back(other),
        }
    }

    async fn run_session(&mut self, session_id: SessionId, request: ChatRequest) {
        assistant_logging::set_session(Some(session_id));
        let abort = self.shutdown.child_token();
        self.abort = Some(abort.clone());

        let end = self.stream_session(session_id, &request, &abort).await;

        self.abort = None;
        self.feed(Msg::SessionEnded { session_id, end });
        if let Some((token, _)) = self.fallback.take() {
            assistant_debug!("fallback {} outlived its session", token.value());
        }
        assistant_logging::set_session(None);
    }

    async fn stream_session(
        &mut self,
        session_id: SessionId,
        request: &ChatRequest,
        abort: &CancellationToken,
    ) -> SessionEnd {
        let backend = Arc::clone(&self.backend);
        let open = backend.open_chat(request);
        tokio::pin!(open);
        let opened = loop {
            tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    assistant_info!("stream aborted before the response arrived");
                    return SessionEnd::Aborted;
                }
                opened = &mut open => break opened,
                Some(msg) = self.inbox.recv() => self.feed(msg),
            }
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(err) => {
                assistant_warn!("chat request failed: {}", err);
                return err.session_end();
            }
        };

        let mut decoder = FrameDecoder::new();
        loop {
            let due = self.fallback.map(|(_, at)| at);
            tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    assistant_info!("stream aborted");
                    return SessionEnd::Aborted;
                }
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for event in decoder.push(&bytes) {
                            self.feed(Msg::StreamEvent { session_id, event });
                        }
                    }
                    Some(Err(err)) => {
                        decoder.finish();
                        assistant_warn!("stream broke: {}", err);
                        return err.session_end();
                    }
                    None => {
                        decoder.finish();
                        if decoder.dropped() > 0 {
                            assistant_info!("stream ended; {} malformed lines dropped", decoder.dropped());
                        }
                        return SessionEnd::Completed;
                    }
                },
                _ = fallback_due(due) => {
                    if let Some((token, _)) = self.fallback.take() {
                        self.feed(Msg::ToolFallbackElapsed { token });
                    }
                }
                Some(msg) = self.inbox.recv() => self.feed(msg),
            }
        }
    }

    /// Picks a voice for every reply. The catalog is polled until populated
    /// only the first time; later replies read it once.
    async fn speak(&mut self, text: &str) {
        let prefs = &self.settings.voice_preferences;
        let voice = match &self.voices {
            None => None,
            Some(catalog) if self.catalog_polled => {
                let voices = catalog.voices();
                select_voice(&voices, prefs).and_then(|index| voices.get(index).cloned())
            }
            Some(catalog) => {
                self.catalog_polled = true;
                resolve_voice(catalog.as_ref(), prefs, &self.settings.voice_poll).await
            }
        };
        self.host.speak(voice.as_ref(), text);
    }

    fn copy(&mut self, document: &DocumentExport) {
        let notice = match copy_document(self.host.clipboard(), document) {
            Ok(CopyOutcome::PlainFallback { warning }) => {
                format!("Copied as plain text ({warning})")
            }
            Ok(_) => "Copied to clipboard".to_string(),
            Err(err) => {
                assistant_warn!("copy failed: {}", err);
                format!("Copy failed: {err}")
            }
        };
        self.host.notify(&notice);
    }

    fn save(&mut self, document: &DocumentExport) {
        let notice = match self.saver.save(document) {
            Ok(path) => format!("Saved {}", path.display()),
            Err(err) => {
                assistant_warn!("download of '{}' failed: {}", document.title, err);
                format!("Download failed: {err}")
            }
        };
        self.host.notify(&notice);
    }
}

fn failed(action: ControlAction, err: TransportError) -> Msg {
    Msg::ControlFailed {
        action,
        message: err.to_string(),
    }
}

async fn fallback_due(due: Option<Instant>) {
    match due {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
