//! Ordered chat transcript with at most one in-progress agent message.

use thiserror::Error;

pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
    System,
}

/// An image attached to a message, kept as a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub data_uri: String,
}

impl ImageRef {
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
        }
    }

    /// MIME type declared by the data URI, if any.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.data_uri.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end]).filter(|mime| !mime.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCardState {
    Running,
    Finished,
    /// Closed without a `tool_end` (superseded or session terminated).
    Abandoned,
}

/// Transcript card for one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCard {
    pub name: String,
    pub args_preview: String,
    pub state: ToolCardState,
    pub output_preview: Option<String>,
}

/// One rendered block of a message. Blocks are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Markdown(String),
    Tool(ToolCard),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub blocks: Vec<Block>,
    pub attachments: Vec<ImageRef>,
    pub completed: bool,
    /// Transient `thinking` status, cleared on completion.
    pub status: Option<String>,
}

impl Message {
    /// Concatenated markdown text of the message.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Markdown(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Error(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn has_error(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn tool_cards(&self) -> impl Iterator<Item = &ToolCard> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Tool(card) => Some(card),
            _ => None,
        })
    }
}

/// Location of a tool card inside the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRef {
    pub message_id: MessageId,
    pub block_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("no agent message is in progress")]
    NoActiveMessage,
    #[error("agent message {0} is already in progress")]
    AlreadyInProgress(MessageId),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: MessageId,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// The in-progress agent message, if a generation is active.
    pub fn in_progress(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| !message.completed)
    }

    pub fn append_user(&mut self, text: &str, images: Vec<ImageRef>) -> MessageId {
        self.push_completed(Role::User, text, images)
    }

    pub fn append_system(&mut self, text: &str) -> MessageId {
        self.push_completed(Role::System, text, Vec::new())
    }

    /// Opens the single in-progress agent message.
    pub fn append_agent_placeholder(&mut self) -> Result<MessageId, TranscriptError> {
        if let Some(active) = self.in_progress() {
            return Err(TranscriptError::AlreadyInProgress(active.id));
        }
        let id = self.allocate_id();
        self.messages.push(Message {
            id,
            role: Role::Agent,
            blocks: Vec::new(),
            attachments: Vec::new(),
            completed: false,
            status: None,
        });
        Ok(id)
    }

    /// Appends a new markdown block; earlier blocks are never rewritten.
    pub fn append_content_fragment(&mut self, text: &str) -> Result<(), TranscriptError> {
        let message = self.active_mut()?;
        if !text.is_empty() {
            message.blocks.push(Block::Markdown(text.to_string()));
        }
        Ok(())
    }

    pub fn append_error_annotation(&mut self, message: &str) -> Result<(), TranscriptError> {
        self.active_mut()?
            .blocks
            .push(Block::Error(message.to_string()));
        Ok(())
    }

    pub fn set_status(&mut self, status: Option<String>) -> Result<(), TranscriptError> {
        self.active_mut()?.status = status;
        Ok(())
    }

    pub fn push_tool_card(&mut self, card: ToolCard) -> Result<CardRef, TranscriptError> {
        let message = self.active_mut()?;
        message.blocks.push(Block::Tool(card));
        Ok(CardRef {
            message_id: message.id,
            block_index: message.blocks.len() - 1,
        })
    }

    /// Tool card of the in-progress message. Cards of completed messages are frozen.
    pub fn tool_card_mut(&mut self, card: CardRef) -> Option<&mut ToolCard> {
        let message = self
            .messages
            .iter_mut()
            .find(|message| message.id == card.message_id && !message.completed)?;
        match message.blocks.get_mut(card.block_index) {
            Some(Block::Tool(tool)) => Some(tool),
            _ => None,
        }
    }

    /// Freezes the in-progress message. Later fragments need a new message.
    pub fn mark_completed(&mut self) -> Result<MessageId, TranscriptError> {
        let message = self.active_mut()?;
        message.completed = true;
        message.status = None;
        Ok(message.id)
    }

    /// Whole-transcript reset.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replaces the transcript with replayed history, all messages completed.
    pub fn replace_all(&mut self, entries: Vec<(Role, String, Vec<ImageRef>)>) {
        self.messages.clear();
        for (role, text, images) in entries {
            self.push_completed(role, &text, images);
        }
    }

    fn push_completed(&mut self, role: Role, text: &str, images: Vec<ImageRef>) -> MessageId {
        let id = self.allocate_id();
        let blocks = if text.is_empty() {
            Vec::new()
        } else {
            vec![Block::Markdown(text.to_string())]
        };
        let message = Message {
            id,
            role,
            blocks,
            attachments: images,
            completed: true,
            status: None,
        };
        self.messages.push(message);
        id
    }

    fn active_mut(&mut self) -> Result<&mut Message, TranscriptError> {
        self.messages
            .iter_mut()
            .rev()
            .find(|message| !message.completed)
            .ok_or(TranscriptError::NoActiveMessage)
    }

    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        self.next_id
    }
}
