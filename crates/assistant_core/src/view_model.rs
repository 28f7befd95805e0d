use crate::{
    Attachment, AttachmentId, AttachmentKind, BackendConfig, LiveCanvas, Message, SessionOutcome,
    SessionState, ToolPhase,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub session: SessionState,
    pub input: String,
    pub messages: Vec<Message>,
    pub canvas: Option<LiveCanvas>,
    pub tool: ToolPhase,
    pub attachments: Vec<AttachmentView>,
    pub config: BackendConfig,
    pub last_outcome: Option<SessionOutcome>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn is_generating(&self) -> bool {
        matches!(self.session, SessionState::Active { .. })
    }
}

/// One staged attachment chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentView {
    pub id: AttachmentId,
    pub name: String,
    pub is_image: bool,
    pub size_bytes: Option<u64>,
}

impl AttachmentView {
    pub(crate) fn new(id: AttachmentId, attachment: &Attachment) -> Self {
        let (is_image, size_bytes) = match &attachment.kind {
            AttachmentKind::Image { .. } => (true, None),
            AttachmentKind::File { size_bytes } => (false, *size_bytes),
        };
        Self {
            id,
            name: attachment.name.clone(),
            is_image,
            size_bytes,
        }
    }
}
