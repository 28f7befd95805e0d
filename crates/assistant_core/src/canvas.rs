//! Canvas payloads carried by `canvas_update` events and broadcasts.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use assistant_logging::assistant_warn;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorSwatch {
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub rgb: String,
    #[serde(default)]
    pub pigment: String,
    #[serde(default)]
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorPalette {
    pub colors: Vec<ColorSwatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OcrText {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebPreview {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One frame of the live screen monitor with its HUD fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorFrame {
    pub image: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub context: String,
    /// Distinguishes concurrent monitor feeds; absent for the default feed.
    #[serde(default)]
    pub stream_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchFailure {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinPreview {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenericDocument {
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedPayload {
    ColorPalette(ColorPalette),
    Ocr(OcrText),
    SearchResults(SearchResults),
    WebPreview(WebPreview),
    MonitorStream(MonitorFrame),
    SearchError(SearchFailure),
    PinPreview(PinPreview),
    GenericDocument(GenericDocument),
}

const KNOWN_TYPES: &[&str] = &[
    "color_palette",
    "ocr",
    "search_results",
    "web_preview",
    "monitor_stream",
    "search_error",
    "pin_preview",
    "generic_document",
];

/// Content for the canvas surface.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasPayload {
    ColorPalette(ColorPalette),
    Ocr(OcrText),
    SearchResults(SearchResults),
    WebPreview(WebPreview),
    MonitorStream(MonitorFrame),
    SearchError(SearchFailure),
    PinPreview(PinPreview),
    GenericDocument(GenericDocument),
    /// Untagged markup fragment, passed through.
    Html(String),
    /// Verbatim text block; also the recovery shape for unrenderable payloads.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("malformed {kind} payload: {message}")]
    Malformed { kind: String, message: String },
}

impl From<TaggedPayload> for CanvasPayload {
    fn from(payload: TaggedPayload) -> Self {
        match payload {
            TaggedPayload::ColorPalette(p) => CanvasPayload::ColorPalette(p),
            TaggedPayload::Ocr(p) => CanvasPayload::Ocr(p),
            TaggedPayload::SearchResults(p) => CanvasPayload::SearchResults(p),
            TaggedPayload::WebPreview(p) => CanvasPayload::WebPreview(p),
            TaggedPayload::MonitorStream(p) => CanvasPayload::MonitorStream(p),
            TaggedPayload::SearchError(p) => CanvasPayload::SearchError(p),
            TaggedPayload::PinPreview(p) => CanvasPayload::PinPreview(p),
            TaggedPayload::GenericDocument(p) => CanvasPayload::GenericDocument(p),
        }
    }
}

impl CanvasPayload {
    /// Strict decoding of a payload value.
    ///
    /// A known `type` with the wrong shape is a [`RenderError`]; anything
    /// untagged goes through the raw fallback chain.
    pub fn parse(value: Value) -> Result<CanvasPayload, RenderError> {
        match value {
            Value::String(raw) => Ok(Self::from_raw(raw)),
            Value::Object(map) => {
                let kind = map.get("type").and_then(Value::as_str).map(str::to_owned);
                match kind {
                    Some(kind) if KNOWN_TYPES.contains(&kind.as_str()) => {
                        serde_json::from_value::<TaggedPayload>(Value::Object(map))
                            .map(CanvasPayload::from)
                            .map_err(|err| RenderError::Malformed {
                                kind,
                                message: err.to_string(),
                            })
                    }
                    _ => Ok(untyped_object(map)),
                }
            }
            Value::Null => Ok(CanvasPayload::Text(String::new())),
            other => Ok(CanvasPayload::Text(pretty(&other))),
        }
    }

    /// Lenient decoding: render failures degrade to a verbatim text block.
    pub fn from_value(value: Value) -> CanvasPayload {
        let verbatim = pretty(&value);
        match Self::parse(value) {
            Ok(payload) => payload,
            Err(err) => {
                assistant_warn!("Canvas payload not renderable, showing raw text: {}", err);
                CanvasPayload::Text(verbatim)
            }
        }
    }

    /// Fallback chain for raw content: markup passthrough, then
    /// JSON-parse-and-retry, then verbatim text.
    pub fn from_raw(raw: String) -> CanvasPayload {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('<') {
            return CanvasPayload::Html(raw);
        }
        if trimmed.starts_with('{') {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(value);
            }
        }
        CanvasPayload::Text(raw)
    }

    /// Discriminator name, matching the wire `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            CanvasPayload::ColorPalette(_) => "color_palette",
            CanvasPayload::Ocr(_) => "ocr",
            CanvasPayload::SearchResults(_) => "search_results",
            CanvasPayload::WebPreview(_) => "web_preview",
            CanvasPayload::MonitorStream(_) => "monitor_stream",
            CanvasPayload::SearchError(_) => "search_error",
            CanvasPayload::PinPreview(_) => "pin_preview",
            CanvasPayload::GenericDocument(_) => "generic_document",
            CanvasPayload::Html(_) => "html",
            CanvasPayload::Text(_) => "text",
        }
    }
}

fn untyped_object(mut map: serde_json::Map<String, Value>) -> CanvasPayload {
    match map.remove("body") {
        Some(body) => CanvasPayload::GenericDocument(GenericDocument {
            title: map.get("title").and_then(Value::as_str).map(str::to_owned),
            body: pretty(&body),
        }),
        None => CanvasPayload::Text(pretty(&Value::Object(map))),
    }
}

fn pretty(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_payloads_decode() {
        let payload = CanvasPayload::from_value(json!({
            "type": "search_results",
            "query": "cats",
            "results": [{"title": "Cats", "url": "https://cats.example"}]
        }));
        match payload {
            CanvasPayload::SearchResults(results) => {
                assert_eq!(results.query, "cats");
                assert_eq!(results.results[0].snippet, None);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn malformed_known_type_is_render_error_and_degrades_to_text() {
        let value = json!({"type": "color_palette", "colors": "red"});
        assert!(matches!(
            CanvasPayload::parse(value.clone()),
            Err(RenderError::Malformed { ref kind, .. }) if kind == "color_palette"
        ));
        match CanvasPayload::from_value(value) {
            CanvasPayload::Text(text) => assert!(text.contains("color_palette")),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn raw_markup_passes_through() {
        assert_eq!(
            CanvasPayload::from_value(json!("  <svg></svg>")),
            CanvasPayload::Html("  <svg></svg>".into())
        );
    }

    #[test]
    fn raw_json_string_is_parsed_and_retried() {
        let payload = CanvasPayload::from_value(json!("{\"type\":\"ocr\",\"text\":\"scan\"}"));
        assert_eq!(
            payload,
            CanvasPayload::Ocr(OcrText {
                text: "scan".into()
            })
        );
    }

    #[test]
    fn untyped_body_becomes_generic_document() {
        let payload = CanvasPayload::from_value(json!({"title": "Notes", "body": "- a"}));
        assert_eq!(
            payload,
            CanvasPayload::GenericDocument(GenericDocument {
                title: Some("Notes".into()),
                body: "- a".into()
            })
        );
    }

    #[test]
    fn plain_text_is_verbatim() {
        assert_eq!(
            CanvasPayload::from_raw("3 results".into()),
            CanvasPayload::Text("3 results".into())
        );
    }
}
