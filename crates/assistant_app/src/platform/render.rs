//! Turns successive view models into terminal output.
//!
//! The printer remembers what it already wrote, so each render only emits
//! the new content fragments, tool card transitions and canvas changes.

use std::collections::HashMap;

use assistant_core::{
    AppViewModel, AttachmentId, Block, CanvasCard, ElementId, LiveCanvas, Message, MessageId,
    Role, ToolCard, ToolCardState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Text,
    Tool(ToolCardState),
    Error,
}

#[derive(Debug, Default)]
struct MessageCursor {
    marks: Vec<Mark>,
    status: Option<String>,
    completed: bool,
}

#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    cursors: HashMap<MessageId, MessageCursor>,
    canvas: Option<(ElementId, u64)>,
    staged: Vec<AttachmentId>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel, stamp: &str) -> String {
        let mut out = String::new();

        if !self.cursors.is_empty() && view.messages.is_empty() {
            out.push_str("\n[transcript cleared]\n");
        }
        self.cursors
            .retain(|id, _| view.messages.iter().any(|message| message.id == *id));

        for message in &view.messages {
            let is_new = !self.cursors.contains_key(&message.id);
            let cursor = self.cursors.entry(message.id).or_default();
            if is_new {
                out.push_str(&header(message.role, stamp));
            }
            render_message(message, cursor, &mut out);
        }

        self.render_canvas(view.canvas.as_ref(), &mut out);

        let staged: Vec<AttachmentId> = view.attachments.iter().map(|a| a.id).collect();
        if staged != self.staged {
            if !staged.is_empty() {
                let names: Vec<String> = view
                    .attachments
                    .iter()
                    .map(|a| format!("#{} {}", a.id, a.name))
                    .collect();
                out.push_str(&format!("  [staged: {}]\n", names.join(", ")));
            }
            self.staged = staged;
        }

        out
    }

    fn render_canvas(&mut self, live: Option<&LiveCanvas>, out: &mut String) {
        let key = live.map(|live| (live.element_id, frame_count(&live.card)));
        if key == self.canvas {
            return;
        }
        match live {
            Some(live) => out.push_str(&canvas_summary(&live.card)),
            None => out.push_str("  [canvas closed]\n"),
        }
        self.canvas = key;
    }
}

fn header(role: Role, stamp: &str) -> String {
    match role {
        Role::User => format!("\n[{stamp}] you> "),
        Role::Agent => format!("\n[{stamp}] agent> "),
        Role::System => format!("\n[{stamp}] * "),
    }
}

fn render_message(message: &Message, cursor: &mut MessageCursor, out: &mut String) {
    for (index, block) in message.blocks.iter().enumerate() {
        match (block, cursor.marks.get(index).copied()) {
            (Block::Markdown(text), None) => {
                out.push_str(text);
                cursor.marks.push(Mark::Text);
            }
            (Block::Tool(card), None) => {
                out.push_str(&tool_line(card));
                cursor.marks.push(Mark::Tool(card.state));
            }
            (Block::Tool(card), Some(Mark::Tool(state))) if state != card.state => {
                out.push_str(&tool_line(card));
                cursor.marks[index] = Mark::Tool(card.state);
            }
            (Block::Error(text), None) => {
                out.push_str(&format!("\n  ! {text}\n"));
                cursor.marks.push(Mark::Error);
            }
            _ => {}
        }
    }

    if message.status != cursor.status {
        if let Some(status) = &message.status {
            out.push_str(&format!("\n  ({status})\n"));
        }
        cursor.status = message.status.clone();
    }

    if message.completed && !cursor.completed {
        if !message.attachments.is_empty() {
            out.push_str(&format!("  [{} image(s)]", message.attachments.len()));
        }
        out.push('\n');
        cursor.completed = true;
    }
}

fn tool_line(card: &ToolCard) -> String {
    match card.state {
        ToolCardState::Running => format!("\n  [tool {}({}) running]\n", card.name, card.args_preview),
        ToolCardState::Finished => match &card.output_preview {
            Some(output) => format!("  [tool {} finished: {}]\n", card.name, output),
            None => format!("  [tool {} finished]\n", card.name),
        },
        ToolCardState::Abandoned => format!("  [tool {} interrupted]\n", card.name),
    }
}

fn frame_count(card: &CanvasCard) -> u64 {
    match card {
        CanvasCard::Monitor { frames, .. } => *frames,
        _ => 0,
    }
}

fn canvas_summary(card: &CanvasCard) -> String {
    match card {
        CanvasCard::Placeholder { tool, detail } => format!("  [canvas] {tool}: {detail}\n"),
        CanvasCard::Notice { title, detail } => format!("  [canvas] {title}. {detail}\n"),
        CanvasCard::Palette { swatches } => {
            let colors: Vec<String> = swatches
                .iter()
                .map(|s| format!("{} {} {:.0}%", s.hex, s.pigment, s.proportion * 100.0))
                .collect();
            format!("  [canvas] palette: {}\n", colors.join(", "))
        }
        CanvasCard::Document(document) => format!(
            "  [canvas] {} ({} chars, /copy or /save)\n",
            document.title,
            document.body.chars().count()
        ),
        CanvasCard::SearchResults { query, results } => {
            let mut text = format!("  [canvas] results for \"{query}\":\n");
            for (rank, link) in results.iter().enumerate() {
                let host = link.host.as_deref().unwrap_or(&link.url);
                text.push_str(&format!("    {}. {} ({})\n", rank + 1, link.title, host));
            }
            text
        }
        CanvasCard::SearchError { query, error } => {
            format!("  [canvas] search for \"{query}\" failed: {error}\n")
        }
        CanvasCard::WebPreview { title, url, .. } => match url {
            Some(url) => format!("  [canvas] page: {title} <{url}>\n"),
            None => format!("  [canvas] page: {title}\n"),
        },
        CanvasCard::PinPreview { title, image_url } => {
            format!("  [canvas] pin: {title} <{image_url}>\n")
        }
        CanvasCard::Monitor { hud, frames, .. } => format!(
            "  [monitor #{frames}] goal: {} | tool: {} | {}\n",
            hud.goal, hud.tool, hud.context
        ),
    }
}
