//! Tool invocation lifecycle and the placeholder fallback timer.
//!
//! Only the most recent unfinished invocation is tracked as running. A
//! long-running visual tool (search, browse, video watch) also puts a
//! placeholder on the canvas and arms a fallback timer; the timer is
//! cancelled as soon as a `canvas_update` or `tool_end` resolves it. When a
//! timer fires, the tracker re-checks that its placeholder is still the live
//! canvas card before touching the surface.

use std::time::Duration;

use assistant_logging::{assistant_debug, assistant_info, assistant_warn};

use crate::canvas::CanvasPayload;
use crate::protocol::ToolOutput;
use crate::render::CanvasSurface;
use crate::transcript::{CardRef, ToolCard, ToolCardState, Transcript};

/// How long a placeholder may stay on the canvas without a result.
pub const TOOL_FALLBACK_DELAY: Duration = Duration::from_secs(45);

/// Maximum characters of tool output shown on a finished card.
pub const TOOL_OUTPUT_PREVIEW_CHARS: usize = 100;

/// Identity of one armed fallback timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FallbackToken(u64);

impl FallbackToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Timer requests the host must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Arm {
        token: FallbackToken,
        delay: Duration,
    },
    Cancel {
        token: FallbackToken,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisualClass {
    Search,
    Browse,
    Watch,
}

impl VisualClass {
    fn of(tool: &str) -> Option<Self> {
        let name = tool.to_ascii_lowercase();
        if name.contains("search") {
            Some(VisualClass::Search)
        } else if name.contains("browse") {
            Some(VisualClass::Browse)
        } else if name.contains("watch") || name.contains("video") {
            Some(VisualClass::Watch)
        } else {
            None
        }
    }

    fn scanning_label(self) -> &'static str {
        match self {
            VisualClass::Search => "Searching the web...",
            VisualClass::Browse => "Reading the page...",
            VisualClass::Watch => "Watching the video...",
        }
    }

    fn finished_label(self) -> &'static str {
        match self {
            VisualClass::Search => "Search finished",
            VisualClass::Browse => "Browsing finished",
            VisualClass::Watch => "Video processing finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunningTool {
    name: String,
    args_preview: String,
    card: Option<CardRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArmedFallback {
    token: FallbackToken,
    class: VisualClass,
    tool: String,
}

/// Observable tracker state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPhase {
    Idle,
    Running { name: String, args_preview: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallTracker {
    running: Option<RunningTool>,
    armed: Option<ArmedFallback>,
    next_token: u64,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ToolPhase {
        match &self.running {
            Some(running) => ToolPhase::Running {
                name: running.name.clone(),
                args_preview: running.args_preview.clone(),
            },
            None => ToolPhase::Idle,
        }
    }

    pub fn armed_token(&self) -> Option<FallbackToken> {
        self.armed.as_ref().map(|armed| armed.token)
    }

    /// `tool_start`: opens a running card and, for visual tools, shows a
    /// placeholder and arms the fallback timer.
    pub fn start(
        &mut self,
        transcript: &mut Transcript,
        canvas: &mut CanvasSurface,
        name: &str,
        args_preview: &str,
    ) -> Vec<TimerCommand> {
        let mut commands = Vec::new();
        if let Some(previous) = self.running.take() {
            assistant_debug!("tool '{}' superseded by '{}'", previous.name, name);
            close_card(transcript, previous.card, ToolCardState::Abandoned, None);
        }
        if let Some(previous) = self.armed.take() {
            settle_placeholder(canvas, &previous);
            commands.push(TimerCommand::Cancel {
                token: previous.token,
            });
        }

        let card = transcript
            .push_tool_card(ToolCard {
                name: name.to_string(),
                args_preview: args_preview.to_string(),
                state: ToolCardState::Running,
                output_preview: None,
            })
            .map_err(|err| assistant_warn!("tool card for '{}' not placed: {}", name, err))
            .ok();
        self.running = Some(RunningTool {
            name: name.to_string(),
            args_preview: args_preview.to_string(),
            card,
        });

        if let Some(class) = VisualClass::of(name) {
            self.next_token += 1;
            let token = FallbackToken(self.next_token);
            canvas.show_placeholder(token, name, class.scanning_label());
            self.armed = Some(ArmedFallback {
                token,
                class,
                tool: name.to_string(),
            });
            commands.push(TimerCommand::Arm {
                token,
                delay: TOOL_FALLBACK_DELAY,
            });
        }
        commands
    }

    /// A real canvas payload arrived; the armed placeholder is resolved.
    pub fn canvas_updated(&mut self) -> Vec<TimerCommand> {
        match self.armed.take() {
            Some(armed) => vec![TimerCommand::Cancel {
                token: armed.token,
            }],
            None => Vec::new(),
        }
    }

    /// `tool_end`: finishes the running card and replaces a still-live
    /// placeholder with a best-effort rendering of the raw output.
    pub fn finish(
        &mut self,
        transcript: &mut Transcript,
        canvas: &mut CanvasSurface,
        output: &ToolOutput,
    ) -> Vec<TimerCommand> {
        let text = output.primary_text();
        match self.running.take() {
            Some(running) => close_card(
                transcript,
                running.card,
                ToolCardState::Finished,
                Some(preview(&text)),
            ),
            None => assistant_debug!("tool_end without a running tool; card untouched"),
        }

        // Any live placeholder is stale once a tool has returned, tracked or not.
        if canvas.live_placeholder().is_some() {
            assistant_info!("replacing stale tool placeholder with raw tool output");
            canvas.render(CanvasPayload::from_raw(text));
        }

        match self.armed.take() {
            Some(armed) => vec![TimerCommand::Cancel {
                token: armed.token,
            }],
            None => Vec::new(),
        }
    }

    /// The fallback timer fired. Acts only if `token` is still armed and its
    /// placeholder is still the live canvas card.
    pub fn fallback_elapsed(&mut self, canvas: &mut CanvasSurface, token: FallbackToken) -> bool {
        let Some(armed) = self.armed.take_if(|armed| armed.token == token) else {
            assistant_debug!("ignoring stale fallback timer {}", token.value());
            return false;
        };
        settle_placeholder(canvas, &armed)
    }

    /// Terminal cleanup: no card stays running and no timer stays armed.
    pub fn close_session(
        &mut self,
        transcript: &mut Transcript,
        canvas: &mut CanvasSurface,
    ) -> Vec<TimerCommand> {
        if let Some(running) = self.running.take() {
            assistant_info!("closing unfinished tool '{}'", running.name);
            close_card(transcript, running.card, ToolCardState::Abandoned, None);
        }
        match self.armed.take() {
            Some(armed) => {
                settle_placeholder(canvas, &armed);
                vec![TimerCommand::Cancel {
                    token: armed.token,
                }]
            }
            None => Vec::new(),
        }
    }
}

fn close_card(
    transcript: &mut Transcript,
    card: Option<CardRef>,
    state: ToolCardState,
    output_preview: Option<String>,
) {
    if let Some(tool) = card.and_then(|card| transcript.tool_card_mut(card)) {
        tool.state = state;
        tool.output_preview = output_preview;
    }
}

/// Swaps a still-live placeholder for the "finished" notice.
fn settle_placeholder(canvas: &mut CanvasSurface, armed: &ArmedFallback) -> bool {
    if canvas.live_placeholder() != Some(armed.token) {
        return false;
    }
    assistant_info!(
        "no canvas result for '{}' in time; showing fallback notice",
        armed.tool
    );
    canvas.show_notice(
        armed.class.finished_label(),
        "No visual result arrived. The tool output is in the chat.",
    );
    true
}

/// Character-bounded preview of tool output.
pub fn preview(text: &str) -> String {
    const ELLIPSIS: &str = "...";
    let trimmed = text.trim();
    if trimmed.chars().count() <= TOOL_OUTPUT_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let kept: String = trimmed
        .chars()
        .take(TOOL_OUTPUT_PREVIEW_CHARS - ELLIPSIS.len())
        .collect();
    format!("{kept}{ELLIPSIS}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_bounded_by_characters() {
        let long = "é".repeat(TOOL_OUTPUT_PREVIEW_CHARS + 5);
        let short = preview(&long);
        assert_eq!(short.chars().count(), TOOL_OUTPUT_PREVIEW_CHARS);
        assert!(short.ends_with("é..."));
        assert_eq!(preview("  3 results "), "3 results");
    }

    #[test]
    fn preview_never_exceeds_the_limit() {
        let limit = TOOL_OUTPUT_PREVIEW_CHARS;
        for len in [limit - 1, limit, limit + 1, 150] {
            let text = "x".repeat(len);
            let short = preview(&text);
            assert!(short.chars().count() <= TOOL_OUTPUT_PREVIEW_CHARS, "{len}: {short}");
            if len <= limit {
                assert_eq!(short, text);
            }
        }
    }

    #[test]
    fn visual_classes_match_tool_names() {
        assert_eq!(VisualClass::of("web_search"), Some(VisualClass::Search));
        assert_eq!(VisualClass::of("browse_url"), Some(VisualClass::Browse));
        assert_eq!(VisualClass::of("watch_video"), Some(VisualClass::Watch));
        assert_eq!(VisualClass::of("read_file"), None);
    }

    #[test]
    fn stale_timer_is_ignored() {
        let mut tracker = ToolCallTracker::new();
        let mut transcript = Transcript::new();
        let mut canvas = CanvasSurface::new();
        transcript.append_agent_placeholder().unwrap();

        let commands = tracker.start(&mut transcript, &mut canvas, "web_search", "cats");
        let token = match commands.as_slice() {
            [TimerCommand::Arm { token, delay }] => {
                assert_eq!(*delay, TOOL_FALLBACK_DELAY);
                *token
            }
            other => panic!("unexpected commands {other:?}"),
        };
        tracker.canvas_updated();

        assert!(!tracker.fallback_elapsed(&mut canvas, token));
    }
}
