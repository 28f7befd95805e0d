//! Parsing of terminal input lines into client messages.

use std::path::{Path, PathBuf};

use assistant_core::{Attachment, Msg};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub const HELP: &str = "\
Type a message and press Enter to send it.
  /attach <path>      stage an image or file for the next message
  /detach <id>        remove a staged attachment
  /screenshot         stage a screenshot of the agent's screen
  /stop               stop the current reply (also Ctrl-C)
  /copy, /save        copy or download the canvas document
  /close              dismiss the canvas
  /config             show the backend configuration
  /provider <name> [model]
  /hybrid on|off      toggle hybrid routing
  /history            reload the conversation
  /reset              clear the conversation
  /quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text to send as the next message.
    Send(String),
    Attach(PathBuf),
    Dispatch(Msg),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(pub String);

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, UsageError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let command = match (name, args.as_slice()) {
        ("attach", [_, ..]) => Command::Attach(PathBuf::from(args.join(" "))),
        ("detach", [id]) => match id.trim_start_matches('#').parse() {
            Ok(id) => Command::Dispatch(Msg::AttachmentRemoved(id)),
            Err(_) => return Err(UsageError(format!("not an attachment id: {id}"))),
        },
        ("screenshot", []) => Command::Dispatch(Msg::ScreenshotRequested),
        ("stop", []) => Command::Dispatch(Msg::AbortRequested),
        ("copy", []) => Command::Dispatch(Msg::CanvasCopyRequested),
        ("save", []) => Command::Dispatch(Msg::CanvasDownloadRequested),
        ("close", []) => Command::Dispatch(Msg::CanvasDismissed),
        ("config", []) => Command::Dispatch(Msg::ConfigRequested),
        ("history", []) => Command::Dispatch(Msg::HistoryRequested),
        ("reset", []) => Command::Dispatch(Msg::ResetRequested),
        ("provider", [provider]) => Command::Dispatch(Msg::ProviderSwitchRequested {
            provider: provider.to_string(),
            model: None,
        }),
        ("provider", [provider, model]) => Command::Dispatch(Msg::ProviderSwitchRequested {
            provider: provider.to_string(),
            model: Some(model.to_string()),
        }),
        ("hybrid", ["on"]) => Command::Dispatch(Msg::HybridRoutingToggled(true)),
        ("hybrid", ["off"]) => Command::Dispatch(Msg::HybridRoutingToggled(false)),
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => return Err(UsageError(format!("unknown command: {line} (try /help)"))),
    };
    Ok(Some(command))
}

/// Image MIME type for `path`, judged by extension.
pub fn image_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Reads `path` into an attachment. Images are inlined as data URIs, other
/// files are only announced by name.
pub async fn load_attachment(path: &Path) -> std::io::Result<Attachment> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match image_mime(path) {
        Some(mime) => {
            let bytes = tokio::fs::read(path).await?;
            Ok(Attachment::image(name, data_uri(mime, &bytes)))
        }
        None => {
            let metadata = tokio::fs::metadata(path).await?;
            Ok(Attachment::file(name, Some(metadata.len())))
        }
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
