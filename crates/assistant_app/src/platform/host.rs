use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};

use assistant_core::{AppViewModel, VoiceDescriptor};
use assistant_engine::{ChatHost, Clipboard, ClipboardError, VoiceCatalog};
use assistant_logging::{assistant_info, assistant_warn};
use tokio::process::Command;

use super::render::TranscriptPrinter;

/// Prints the transcript to stdout and runs speech and clipboard requests.
pub struct TerminalHost {
    printer: TranscriptPrinter,
    speech: SpeechOutput,
    clipboard: SystemClipboard,
}

impl TerminalHost {
    pub fn new(speech_command: Option<Vec<String>>) -> Self {
        Self {
            printer: TranscriptPrinter::new(),
            speech: SpeechOutput::new(speech_command),
            clipboard: SystemClipboard,
        }
    }
}

impl ChatHost for TerminalHost {
    fn render(&mut self, view: &AppViewModel) {
        let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
        let text = self.printer.render(view, &stamp);
        if text.is_empty() {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn speak(&mut self, voice: Option<&VoiceDescriptor>, text: &str) {
        self.speech.speak(voice, text);
    }

    fn clipboard(&mut self) -> &mut dyn Clipboard {
        &mut self.clipboard
    }

    fn notify(&mut self, text: &str) {
        println!("  ({text})");
    }
}

/// System clipboard. A fresh handle is opened per operation.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_rich(&mut self, html: &str, plain: &str) -> Result<(), ClipboardError> {
        let mut clipboard = open_clipboard()?;
        clipboard
            .set_html(html, Some(plain))
            .map_err(|err| ClipboardError::Refused(err.to_string()))
    }

    fn set_plain(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = open_clipboard()?;
        clipboard
            .set_text(text)
            .map_err(|err| ClipboardError::Refused(err.to_string()))
    }
}

fn open_clipboard() -> Result<arboard::Clipboard, ClipboardError> {
    arboard::Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))
}

/// Speaks through an external program, or only logs when none is set.
pub struct SpeechOutput {
    command: Option<Vec<String>>,
}

impl SpeechOutput {
    pub fn new(command: Option<Vec<String>>) -> Self {
        Self {
            command: command.filter(|parts| !parts.is_empty()),
        }
    }

    pub fn speak(&self, voice: Option<&VoiceDescriptor>, text: &str) {
        let Some(parts) = &self.command else {
            assistant_info!("Speech output disabled, {} chars not spoken", text.chars().count());
            return;
        };
        let voice_name = voice.map(|v| v.name.as_str()).unwrap_or("default");
        let args = expand_args(&parts[1..], voice_name, text);

        let program = parts[0].clone();
        tokio::spawn(async move {
            match run_speech(&program, &args).await {
                Ok(status) if status.success() => {}
                Ok(status) => assistant_warn!("Speech command {} exited with {}", program, status),
                Err(err) => assistant_warn!("Failed to run speech command {}: {}", program, err),
            }
        });
    }
}

/// Runs the speech program to completion. Must be called inside the runtime.
async fn run_speech(program: &str, args: &[String]) -> io::Result<ExitStatus> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .await
}

fn expand_args(template: &[String], voice: &str, text: &str) -> Vec<String> {
    let mut saw_text = false;
    let mut args: Vec<String> = template
        .iter()
        .map(|arg| {
            saw_text |= arg.contains("{text}");
            arg.replace("{voice}", voice).replace("{text}", text)
        })
        .collect();
    if !saw_text {
        args.push(text.to_string());
    }
    args
}

/// Voice list configured in the settings file.
pub struct StaticVoiceCatalog {
    voices: Vec<VoiceDescriptor>,
}

impl StaticVoiceCatalog {
    pub fn new(voices: Vec<VoiceDescriptor>) -> Self {
        Self { voices }
    }
}

impl VoiceCatalog for StaticVoiceCatalog {
    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn placeholders_are_substituted() {
        let args = expand_args(&strings(&["-v", "{voice}", "{text}"]), "Zira", "Hello");
        assert_eq!(args, strings(&["-v", "Zira", "Hello"]));
    }

    #[test]
    fn text_is_appended_without_placeholder() {
        let args = expand_args(&strings(&["--rate", "180"]), "default", "Hello");
        assert_eq!(args, strings(&["--rate", "180", "Hello"]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn speech_exit_status_is_reported() {
        let ok = run_speech("sh", &strings(&["-c", "exit 0"])).await.unwrap();
        assert!(ok.success());

        let failed = run_speech("sh", &strings(&["-c", "exit 3"])).await.unwrap();
        assert_eq!(failed.code(), Some(3));

        assert!(run_speech("assistant-no-such-speech-program", &[]).await.is_err());
    }

    #[test]
    fn empty_command_disables_speech() {
        assert!(SpeechOutput::new(Some(Vec::new())).command.is_none());
    }
}
