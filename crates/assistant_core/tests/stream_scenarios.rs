use std::sync::Once;

use assistant_core::{
    update, AppState, CanvasCard, CanvasOrigin, Effect, FallbackToken, Msg, SessionEnd,
    SessionOutcome, StreamEvent, ToolCardState, ToolOutput, TOOL_FALLBACK_DELAY,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(assistant_logging::initialize_for_tests);
}

fn start_session(input: &str) -> AppState {
    let (state, _) = update(AppState::new(), Msg::InputChanged(input.to_string()));
    let (state, effects) = update(state, Msg::MessageSubmitted);
    assert!(matches!(effects[..], [Effect::SendChat { session_id: 1, .. }]));
    state
}

fn feed(state: AppState, event: StreamEvent) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StreamEvent {
            session_id: 1,
            event,
        },
    )
}

fn end(state: AppState, end: SessionEnd) -> (AppState, Vec<Effect>) {
    update(state, Msg::SessionEnded { session_id: 1, end })
}

fn tool_start(tool: &str, args: serde_json::Value) -> StreamEvent {
    StreamEvent::ToolStart {
        tool: tool.to_string(),
        args,
    }
}

fn tool_end(output: &str) -> StreamEvent {
    StreamEvent::ToolEnd {
        tool: None,
        output: ToolOutput::Text(output.to_string()),
    }
}

fn armed_token(effects: &[Effect]) -> FallbackToken {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::ArmToolFallback { token, delay } => {
                assert_eq!(*delay, TOOL_FALLBACK_DELAY);
                Some(*token)
            }
            _ => None,
        })
        .expect("fallback timer armed")
}

fn search_results_payload() -> serde_json::Value {
    json!({
        "type": "search_results",
        "query": "rust ndjson",
        "results": [
            {"title": "NDJSON", "url": "https://www.ndjson.org/", "snippet": "Newline delimited"}
        ]
    })
}

#[test]
fn visual_tool_with_timely_canvas_cancels_fallback() {
    init_logging();
    let state = start_session("find ndjson docs");
    let (state, effects) = feed(state, tool_start("web_search", json!({"query": "ndjson"})));
    let token = armed_token(&effects);
    assert!(matches!(
        state.canvas().live().map(|live| &live.card),
        Some(CanvasCard::Placeholder { .. })
    ));

    let (state, effects) = feed(
        state,
        StreamEvent::CanvasUpdate {
            content: search_results_payload(),
        },
    );
    assert_eq!(effects, vec![Effect::CancelToolFallback { token }]);

    let (state, effects) = feed(state, tool_end("3 results"));
    assert!(effects.is_empty());
    let live = state.canvas().live().expect("canvas visible");
    assert_eq!(live.origin, CanvasOrigin::Payload);
    match &live.card {
        CanvasCard::SearchResults { query, results } => {
            assert_eq!(query, "rust ndjson");
            assert_eq!(results[0].host, "ndjson.org");
        }
        other => panic!("unexpected card: {other:?}"),
    }

    // A late timer for the already-resolved tool must not touch the canvas.
    let (state, effects) = update(state, Msg::ToolFallbackElapsed { token });
    assert!(effects.is_empty());
    assert_eq!(state.canvas().live().map(|live| live.origin), Some(CanvasOrigin::Payload));
}

#[test]
fn fallback_settles_placeholder_and_late_canvas_replaces_notice() {
    init_logging();
    let state = start_session("search slowly");
    let (state, effects) = feed(state, tool_start("web_search", json!({"query": "slow"})));
    let token = armed_token(&effects);

    let (state, _) = update(state, Msg::ToolFallbackElapsed { token });
    let live = state.canvas().live().expect("notice visible");
    assert_eq!(live.origin, CanvasOrigin::Notice);
    match &live.card {
        CanvasCard::Notice { title, .. } => assert_eq!(title, "Search finished"),
        other => panic!("unexpected card: {other:?}"),
    }

    let (state, _) = feed(
        state,
        StreamEvent::CanvasUpdate {
            content: search_results_payload(),
        },
    );
    assert!(matches!(
        state.canvas().live().map(|live| &live.card),
        Some(CanvasCard::SearchResults { .. })
    ));
}

#[test]
fn tool_end_replaces_live_placeholder_with_raw_output() {
    init_logging();
    let state = start_session("browse it");
    let (state, effects) = feed(state, tool_start("browse_page", json!("https://example.com")));
    let token = armed_token(&effects);

    let (state, effects) = feed(state, tool_end("<h1>Example Domain</h1>"));
    assert_eq!(effects, vec![Effect::CancelToolFallback { token }]);

    let live = state.canvas().live().expect("canvas visible");
    assert_eq!(live.origin, CanvasOrigin::Payload);
    let card = state.transcript().messages()[1]
        .tool_cards()
        .next()
        .cloned()
        .expect("tool card");
    assert_eq!(card.state, ToolCardState::Finished);
    assert_eq!(card.output_preview.as_deref(), Some("<h1>Example Domain</h1>"));
}

#[test]
fn non_visual_tool_arms_nothing() {
    init_logging();
    let state = start_session("what time is it");
    let (state, effects) = feed(state, tool_start("clock", json!({})));

    assert!(effects.is_empty());
    assert!(!state.canvas().is_visible());
    assert_eq!(state.tools().armed_token(), None);
}

#[test]
fn superseding_tool_abandons_previous_card() {
    init_logging();
    let state = start_session("two tools");
    let (state, first) = feed(state, tool_start("web_search", json!({"query": "a"})));
    let first_token = armed_token(&first);
    let (state, effects) = feed(state, tool_start("calculator", json!({"expr": "1+1"})));

    assert_eq!(effects, vec![Effect::CancelToolFallback { token: first_token }]);
    let states: Vec<ToolCardState> = state.transcript().messages()[1]
        .tool_cards()
        .map(|card| card.state)
        .collect();
    assert_eq!(states, vec![ToolCardState::Abandoned, ToolCardState::Running]);
}

#[test]
fn session_end_closes_running_tool_and_cancels_timer() {
    init_logging();
    let state = start_session("watch this");
    let (state, effects) = feed(state, tool_start("watch_video", json!({"url": "v"})));
    let token = armed_token(&effects);

    let (state, effects) = end(state, SessionEnd::Aborted);
    assert_eq!(effects, vec![Effect::CancelToolFallback { token }]);
    let reply = &state.transcript().messages()[1];
    assert!(reply.completed);
    assert!(reply
        .tool_cards()
        .all(|card| card.state != ToolCardState::Running));
    assert_eq!(state.canvas().live().map(|live| live.origin), Some(CanvasOrigin::Notice));
    assert_eq!(state.tools().armed_token(), None);
}

#[test]
fn unauthorized_finalizes_with_error_and_no_speech() {
    init_logging();
    let state = start_session("hello");
    let (state, _) = feed(
        state,
        StreamEvent::Content {
            content: "Partial".to_string(),
        },
    );
    let (state, effects) = end(state, SessionEnd::Unauthorized("HTTP 401".to_string()));

    assert!(effects.is_empty());
    assert_eq!(state.last_outcome(), Some(SessionOutcome::Unauthorized));
    assert!(state.transcript().in_progress().is_none());
    let reply = &state.transcript().messages()[1];
    assert!(reply.completed);
    assert!(reply.errors().any(|error| error.starts_with("Unauthorized")));
}

#[test]
fn backend_error_event_annotates_and_stream_end_completes() {
    init_logging();
    let state = start_session("hello");
    let (state, _) = feed(
        state,
        StreamEvent::Error {
            content: "model overloaded".to_string(),
        },
    );
    assert!(state.transcript().in_progress().is_some());

    let (state, _) = end(state, SessionEnd::Completed);
    let reply = &state.transcript().messages()[1];
    assert!(reply.completed);
    assert_eq!(reply.errors().collect::<Vec<_>>(), vec!["model overloaded"]);
    assert_eq!(state.last_outcome(), Some(SessionOutcome::Completed));
}

#[test]
fn at_most_one_message_in_progress_across_sessions() {
    init_logging();
    let mut state = AppState::new();
    for (round, text) in ["one", "two", "three"].into_iter().enumerate() {
        let session_id = round as u64 + 1;
        let (next, _) = update(state, Msg::InputChanged(text.to_string()));
        let (next, effects) = update(next, Msg::MessageSubmitted);
        assert!(matches!(effects[..], [Effect::SendChat { session_id: id, .. }] if id == session_id));
        let in_progress = next
            .transcript()
            .messages()
            .iter()
            .filter(|message| !message.completed)
            .count();
        assert_eq!(in_progress, 1);

        let (next, _) = update(
            next,
            Msg::SessionEnded {
                session_id,
                end: SessionEnd::Completed,
            },
        );
        assert!(next.transcript().in_progress().is_none());
        state = next;
    }
    assert_eq!(state.transcript().len(), 6);
}

#[test]
fn content_after_session_end_is_dropped() {
    init_logging();
    let state = start_session("hello");
    let (state, _) = end(state, SessionEnd::Completed);
    let before = state.clone();
    let (state, effects) = feed(
        state,
        StreamEvent::Content {
            content: "late".to_string(),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn monitor_frames_update_in_place_and_broadcasts_render_outside_turns() {
    init_logging();
    let frame = |goal: &str| {
        json!({
            "type": "monitor_stream",
            "image": "data:image/jpeg;base64,AAAA",
            "goal": goal,
            "tool": "click",
            "context": "desktop"
        })
    };
    let (state, _) = update(AppState::new(), Msg::CanvasBroadcast(frame("open editor")));
    let first = state.canvas().live().map(|live| live.element_id);
    let (state, _) = update(state, Msg::CanvasBroadcast(frame("type text")));
    let live = state.canvas().live().expect("monitor visible");

    assert_eq!(Some(live.element_id), first);
    match &live.card {
        CanvasCard::Monitor { hud, frames, .. } => {
            assert_eq!(hud.goal, "type text");
            assert_eq!(*frames, 2);
        }
        other => panic!("unexpected card: {other:?}"),
    }
}
