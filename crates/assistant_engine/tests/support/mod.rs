#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use assistant_core::{AppViewModel, ChatRequest, HistoryEntry, VoiceDescriptor};
use assistant_engine::{
    AssistantBackend, ByteStream, ChatDriver, ChatHost, Clipboard, ClipboardError, DriverSettings,
    TransportError, VoiceCatalog,
};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(assistant_logging::initialize_for_tests);
}

/// One step of a scripted response body.
pub enum Step {
    Chunk(String),
    Wait(Duration),
    Fail(TransportError),
    /// Keeps the body open forever.
    Hang,
}

pub fn chunk(text: &str) -> Step {
    Step::Chunk(text.to_string())
}

pub enum Reply {
    Stream(Vec<Step>),
    Reject(TransportError),
    /// Response headers never arrive.
    Unanswered,
}

/// Backend that plays back one scripted reply per chat request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
    history: Mutex<Vec<HistoryEntry>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn with_history(replies: Vec<Reply>, history: Vec<HistoryEntry>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            history: Mutex::new(history),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Stream(Vec::new()));
        match reply {
            Reply::Reject(err) => Err(err),
            Reply::Stream(steps) => Ok(play(steps)),
            Reply::Unanswered => std::future::pending().await,
        }
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        Ok(self.history.lock().unwrap().clone())
    }

    async fn reset_history(&self) -> Result<(), TransportError> {
        self.history.lock().unwrap().clear();
        Ok(())
    }
}

fn play(steps: Vec<Step>) -> ByteStream {
    stream::unfold(steps.into_iter(), |mut steps| async move {
        loop {
            match steps.next()? {
                Step::Chunk(text) => return Some((Ok(Bytes::from(text)), steps)),
                Step::Wait(delay) => tokio::time::sleep(delay).await,
                Step::Fail(err) => return Some((Err(err), steps)),
                Step::Hang => std::future::pending::<()>().await,
            }
        }
    })
    .boxed()
}

/// Voice list the test can fill in while the driver holds it.
#[derive(Clone, Default)]
pub struct SharedCatalog {
    voices: Arc<Mutex<Vec<VoiceDescriptor>>>,
}

impl SharedCatalog {
    pub fn install(&self, voices: Vec<VoiceDescriptor>) {
        *self.voices.lock().unwrap() = voices;
    }
}

impl VoiceCatalog for SharedCatalog {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
pub struct FakeClipboard {
    pub refuse_rich: bool,
    pub rich: Option<(String, String)>,
    pub plain: Option<String>,
}

impl Clipboard for FakeClipboard {
    fn set_rich(&mut self, html: &str, plain: &str) -> Result<(), ClipboardError> {
        if self.refuse_rich {
            return Err(ClipboardError::Refused("html format denied".to_string()));
        }
        self.rich = Some((html.to_string(), plain.to_string()));
        Ok(())
    }

    fn set_plain(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.plain = Some(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub views: Vec<AppViewModel>,
    pub spoken: Vec<(Option<String>, String)>,
    pub notices: Vec<String>,
    pub clipboard: FakeClipboard,
}

impl ChatHost for RecordingHost {
    fn render(&mut self, view: &AppViewModel) {
        self.views.push(view.clone());
    }

    fn speak(&mut self, voice: Option<&VoiceDescriptor>, text: &str) {
        self.spoken
            .push((voice.map(|voice| voice.name.clone()), text.to_string()));
    }

    fn clipboard(&mut self) -> &mut dyn Clipboard {
        &mut self.clipboard
    }

    fn notify(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}

pub fn driver(backend: Arc<ScriptedBackend>, download_dir: &Path) -> ChatDriver<RecordingHost> {
    let settings = DriverSettings {
        download_dir: download_dir.to_path_buf(),
        ..DriverSettings::default()
    };
    ChatDriver::new(backend, RecordingHost::default(), settings)
}

pub fn line(json: serde_json::Value) -> String {
    format!("{json}\n")
}
