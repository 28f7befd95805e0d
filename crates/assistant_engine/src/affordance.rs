//! Copy and download for documents shown on the canvas.

use std::path::PathBuf;

use assistant_core::DocumentExport;
use assistant_logging::{assistant_info, assistant_warn};
use thiserror::Error;

use crate::extract::{document_title, html_to_text};
use crate::filename::export_filename;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write refused: {0}")]
    Refused(String),
}

/// Host clipboard. Rich writes carry HTML plus its plain-text rendering.
pub trait Clipboard: Send {
    fn set_rich(&mut self, html: &str, plain: &str) -> Result<(), ClipboardError>;
    fn set_plain(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Rich,
    Plain,
    /// The rich write failed and plain text was written instead.
    PlainFallback { warning: String },
}

/// Copies a canvas document. Markup goes out as HTML plus plain text; a
/// failed rich write degrades to plain text with a warning instead of an error.
pub fn copy_document(
    clipboard: &mut dyn Clipboard,
    document: &DocumentExport,
) -> Result<CopyOutcome, ClipboardError> {
    if !document.is_markup() {
        clipboard.set_plain(&document.body)?;
        return Ok(CopyOutcome::Plain);
    }

    let plain = html_to_text(&document.body);
    match clipboard.set_rich(&document.body, &plain) {
        Ok(()) => Ok(CopyOutcome::Rich),
        Err(err) => {
            assistant_warn!("rich copy of '{}' failed, using plain text: {}", document.title, err);
            clipboard.set_plain(&plain)?;
            Ok(CopyOutcome::PlainFallback {
                warning: err.to_string(),
            })
        }
    }
}

/// Writes canvas documents into the download directory.
#[derive(Debug, Clone)]
pub struct DocumentSaver {
    writer: AtomicFileWriter,
}

impl DocumentSaver {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    /// Markup documents are named after their `<title>` when they carry one.
    pub fn save(&self, document: &DocumentExport) -> Result<PathBuf, PersistError> {
        let filename = match document
            .is_markup()
            .then(|| document_title(&document.body))
            .flatten()
        {
            Some(title) => export_filename(&DocumentExport {
                title,
                ..document.clone()
            }),
            None => export_filename(document),
        };
        let path = self.writer.write(&filename, document.body.as_bytes())?;
        assistant_info!("saved '{}' to {:?}", document.title, path);
        Ok(path)
    }
}
