use assistant_core::{update, AppState, Msg, SessionEnd, StreamEvent};

#[test]
fn abort_while_idle_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::AbortRequested);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn events_for_unknown_sessions_are_noop() {
    let state = AppState::new();
    let (next, effects) = update(
        state.clone(),
        Msg::StreamEvent {
            session_id: 7,
            event: StreamEvent::Content {
                content: "late".to_string(),
            },
        },
    );
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (next, effects) = update(
        state.clone(),
        Msg::SessionEnded {
            session_id: 7,
            end: SessionEnd::Completed,
        },
    );
    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn dismissing_an_empty_canvas_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::CanvasDismissed);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
