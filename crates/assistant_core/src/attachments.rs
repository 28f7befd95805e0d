//! Attachments staged for the next chat turn.

use crate::transcript::ImageRef;

pub type AttachmentId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Sent to the backend as a data URI.
    Image { data_uri: String },
    /// Opaque file; announced in the message text by name.
    File { size_bytes: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
}

impl Attachment {
    pub fn image(name: impl Into<String>, data_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttachmentKind::Image {
                data_uri: data_uri.into(),
            },
        }
    }

    pub fn file(name: impl Into<String>, size_bytes: Option<u64>) -> Self {
        Self {
            name: name.into(),
            kind: AttachmentKind::File { size_bytes },
        }
    }
}

/// Staged attachments split for one outgoing turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrainedAttachments {
    pub images: Vec<ImageRef>,
    pub file_names: Vec<String>,
}

/// Pending attachments in insertion order. Drained as a whole at submit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttachmentStaging {
    entries: Vec<(AttachmentId, Attachment)>,
    next_id: AttachmentId,
}

impl AttachmentStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, attachment: Attachment) -> AttachmentId {
        self.next_id += 1;
        self.entries.push((self.next_id, attachment));
        self.next_id
    }

    pub fn remove(&mut self, id: AttachmentId) -> Option<Attachment> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn entries(&self) -> &[(AttachmentId, Attachment)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the staging area in one step.
    pub fn drain(&mut self) -> DrainedAttachments {
        let mut drained = DrainedAttachments::default();
        for (_, attachment) in std::mem::take(&mut self.entries) {
            match attachment.kind {
                AttachmentKind::Image { data_uri } => drained.images.push(ImageRef::new(data_uri)),
                AttachmentKind::File { .. } => drained.file_names.push(attachment.name),
            }
        }
        drained
    }
}
