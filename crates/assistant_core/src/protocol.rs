//! Wire types exchanged with the assistant backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded record of the chat response stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Free-form status text while the backend works.
    Thinking {
        #[serde(default)]
        content: String,
    },
    /// A backend tool invocation began.
    ToolStart {
        #[serde(default)]
        tool: String,
        #[serde(default)]
        args: Value,
    },
    /// The most recent tool invocation returned.
    ToolEnd {
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        output: ToolOutput,
    },
    /// Side-channel payload for the canvas surface.
    CanvasUpdate {
        #[serde(default)]
        content: Value,
    },
    /// A text fragment of the agent reply.
    Content {
        #[serde(default)]
        content: String,
    },
    /// Human-readable backend failure.
    Error {
        #[serde(default)]
        content: String,
    },
    /// Backend end-of-turn marker. The end of the body is authoritative.
    Done,
}

/// Tool output as reported by `tool_end`: plain text or a sequence whose
/// first element carries the text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Sequence(Vec<Value>),
    Other(Value),
}

impl Default for ToolOutput {
    fn default() -> Self {
        ToolOutput::Text(String::new())
    }
}

impl ToolOutput {
    /// Text used for previews and fallback rendering.
    pub fn primary_text(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Sequence(items) => items.first().map(value_text).unwrap_or_default(),
            ToolOutput::Other(value) => value_text(value),
        }
    }
}

/// Preview text for tool arguments, which usually arrive JSON-encoded as a string.
pub fn args_preview(args: &Value) -> String {
    value_text(args)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Provider/model routing as reported by `GET /api/config`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub hybrid_routing: bool,
    #[serde(default)]
    pub available_providers: Vec<String>,
}

impl BackendConfig {
    /// `provider/model` label appended to client-side error annotations.
    pub fn context_label(&self) -> Option<String> {
        match (self.provider.as_str(), self.model.as_deref()) {
            ("", _) => None,
            (provider, Some(model)) if !model.is_empty() => Some(format!("{provider}/{model}")),
            (provider, _) => Some(provider.to_string()),
        }
    }
}

/// Result of `POST /api/switch`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderSelection {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// One entry of `GET /api/history`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    #[serde(default)]
    pub content: Value,
}

impl HistoryEntry {
    /// Splits the entry content into its text and image parts.
    ///
    /// Content is either a string, null, or a list of
    /// `{type: "text"}` / `{type: "image_url"}` parts.
    pub fn parts(&self) -> (String, Vec<String>) {
        match &self.content {
            Value::String(text) => (text.clone(), Vec::new()),
            Value::Array(parts) => {
                let mut text = String::new();
                let mut images = Vec::new();
                for part in parts {
                    match part.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            if let Some(fragment) = part.get("text").and_then(Value::as_str) {
                                if !text.is_empty() {
                                    text.push('\n');
                                }
                                text.push_str(fragment);
                            }
                        }
                        Some("image_url") => {
                            if let Some(url) = part
                                .get("image_url")
                                .and_then(|image| image.get("url"))
                                .and_then(Value::as_str)
                            {
                                images.push(url.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                (text, images)
            }
            _ => (String::new(), Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_output_prefers_first_sequence_element() {
        let output: ToolOutput = serde_json::from_value(json!(["summary", "/tmp/clip.mp4"])).unwrap();
        assert_eq!(output.primary_text(), "summary");

        let output: ToolOutput = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(output.primary_text(), "");
    }

    #[test]
    fn chat_request_omits_empty_images() {
        let request = ChatRequest {
            message: "hi".into(),
            images: Vec::new(),
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"message": "hi"}));
    }

    #[test]
    fn history_parts_split_text_and_images() {
        let entry: HistoryEntry = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "what is this?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
            ]
        }))
        .unwrap();
        let (text, images) = entry.parts();
        assert_eq!(text, "what is this?");
        assert_eq!(images, vec!["data:image/png;base64,AAAA".to_string()]);
    }

    #[test]
    fn context_label_skips_missing_model() {
        let mut config = BackendConfig {
            provider: "openai".into(),
            ..BackendConfig::default()
        };
        assert_eq!(config.context_label().as_deref(), Some("openai"));
        config.model = Some("gpt-4o".into());
        assert_eq!(config.context_label().as_deref(), Some("openai/gpt-4o"));
        assert_eq!(BackendConfig::default().context_label(), None);
    }
}
