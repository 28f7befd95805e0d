//! Assistant engine: the IO side of the chat client.
//!
//! [`ChatDriver`] owns the core state machine and executes its effects:
//! chat streams over [`AssistantBackend`], fallback timers, control calls,
//! speech, clipboard and downloads.
mod affordance;
mod driver;
mod events_feed;
mod extract;
mod filename;
mod frame;
mod persist;
mod transport;
mod types;
mod voice_wait;

pub use affordance::{copy_document, Clipboard, ClipboardError, CopyOutcome, DocumentSaver};
pub use driver::{ChatDriver, ChatHost, DriverSettings, SubmitError};
pub use events_feed::{forward_broadcasts, EventFeedDecoder, FEED_RETRY_DELAY};
pub use extract::{document_title, html_to_text};
pub use filename::export_filename;
pub use frame::{decode_line, DecodeError, FrameDecoder};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use transport::{AssistantBackend, ByteStream, HttpBackend, TransportSettings};
pub use types::{FailureKind, TransportError};
pub use voice_wait::{resolve_voice, VoiceCatalog, VoicePollSettings};
