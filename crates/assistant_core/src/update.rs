use assistant_logging::{assistant_debug, assistant_warn};

use crate::{AppState, Attachment, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(input) => {
            state.set_input(input);
            Vec::new()
        }
        Msg::MessageSubmitted => {
            if let Some(active) = state.active_session() {
                assistant_debug!("submit ignored; session {} still streaming", active);
                return (state, Vec::new());
            }
            match state.begin_session() {
                Some((session_id, request)) => vec![Effect::SendChat {
                    session_id,
                    request,
                }],
                None => Vec::new(),
            }
        }
        Msg::AttachmentStaged(attachment) => {
            state.stage_attachment(attachment);
            Vec::new()
        }
        Msg::AttachmentRemoved(id) => {
            state.remove_attachment(id);
            Vec::new()
        }
        Msg::StreamEvent { session_id, event } => {
            if !state.is_current(session_id) {
                assistant_debug!("dropping event for stale session {}", session_id);
                return (state, Vec::new());
            }
            state.apply_stream_event(event)
        }
        Msg::SessionEnded { session_id, end } => {
            if !state.is_current(session_id) {
                assistant_debug!("dropping end of stale session {}", session_id);
                return (state, Vec::new());
            }
            state.end_session(end)
        }
        Msg::AbortRequested => match state.active_session() {
            Some(session_id) => vec![Effect::AbortStream { session_id }],
            None => Vec::new(),
        },
        Msg::ToolFallbackElapsed { token } => {
            state.fallback_elapsed(token);
            Vec::new()
        }
        Msg::CanvasBroadcast(content) => {
            state.render_broadcast(content);
            Vec::new()
        }
        Msg::CanvasCopyRequested => state
            .canvas_export()
            .map(Effect::CopyToClipboard)
            .into_iter()
            .collect(),
        Msg::CanvasDownloadRequested => state
            .canvas_export()
            .map(Effect::SaveDocument)
            .into_iter()
            .collect(),
        Msg::CanvasDismissed => {
            state.dismiss_canvas();
            Vec::new()
        }
        Msg::ConfigRequested => vec![Effect::FetchConfig],
        Msg::ConfigLoaded(config) => {
            state.set_config(config);
            Vec::new()
        }
        Msg::HistoryRequested => vec![Effect::FetchHistory],
        Msg::HistoryLoaded(entries) => {
            if state.is_session_active() {
                assistant_warn!("history replay skipped while a reply is streaming");
                return (state, Vec::new());
            }
            state.replay_history(entries);
            Vec::new()
        }
        Msg::ResetRequested => {
            if state.is_session_active() {
                state.append_notice("Stop the current reply before clearing history.");
                return (state, Vec::new());
            }
            vec![Effect::ResetHistory]
        }
        Msg::HistoryReset => {
            if state.is_session_active() {
                assistant_warn!("history reset confirmation arrived mid-session; transcript kept");
                return (state, Vec::new());
            }
            state.clear_history();
            Vec::new()
        }
        Msg::ScreenshotRequested => vec![Effect::CaptureScreenshot],
        Msg::ScreenshotCaptured(data_uri) => {
            state.stage_attachment(Attachment::image("screenshot.png", data_uri));
            Vec::new()
        }
        Msg::ProviderSwitchRequested { provider, model } => {
            vec![Effect::SwitchProvider { provider, model }]
        }
        Msg::ProviderSwitched(selection) => {
            state.set_provider(selection.provider, selection.model);
            Vec::new()
        }
        Msg::HybridRoutingToggled(enabled) => {
            state.set_hybrid_routing(enabled);
            vec![Effect::SetHybridRouting(enabled)]
        }
        Msg::ControlFailed { action, message } => {
            assistant_warn!("{} failed: {}", action, message);
            state.append_notice(&format!("Failed {action}: {message}"));
            Vec::new()
        }
    };

    (state, effects)
}
