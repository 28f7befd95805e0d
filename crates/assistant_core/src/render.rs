//! The single canvas surface and the payload dispatch table.
//!
//! Exactly one card is live at a time. Rendering a payload replaces the live
//! card wholesale under a fresh element id; the one exception is a
//! `monitor_stream` frame landing on a surface that already shows the same
//! monitor feed, which mutates the frame and HUD fields in place.

use url::Url;

use crate::canvas::{
    CanvasPayload, ColorSwatch, GenericDocument, MonitorFrame, PinPreview, SearchFailure,
    SearchResults, WebPreview,
};
use crate::document::{BodyFormat, DocumentExport};
use crate::tools::FallbackToken;

pub type ElementId = u64;

/// Who put the live card on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasOrigin {
    Payload,
    Placeholder(FallbackToken),
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLink {
    pub title: String,
    pub url: String,
    pub host: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HudFields {
    pub goal: String,
    pub tool: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasCard {
    /// Scanning animation shown while a long-running tool is in flight.
    Placeholder { tool: String, detail: String },
    Notice { title: String, detail: String },
    Palette { swatches: Vec<ColorSwatch> },
    Document(DocumentExport),
    SearchResults { query: String, results: Vec<ResultLink> },
    SearchError { query: String, error: String },
    WebPreview {
        title: String,
        html: Option<String>,
        url: Option<String>,
    },
    PinPreview { title: String, image_url: String },
    Monitor {
        frame: String,
        hud: HudFields,
        stream_id: Option<String>,
        frames: u64,
    },
}

impl CanvasCard {
    /// Document behind the copy / download affordances, for cards that carry
    /// extracted text or generated content.
    pub fn export(&self) -> Option<DocumentExport> {
        match self {
            CanvasCard::Document(document) => Some(document.clone()),
            CanvasCard::WebPreview {
                title,
                html: Some(html),
                ..
            } => Some(DocumentExport::new(title.clone(), html.clone(), BodyFormat::Html)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveCanvas {
    pub element_id: ElementId,
    pub origin: CanvasOrigin,
    pub card: CanvasCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Replaced,
    UpdatedInPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendered {
    pub element_id: ElementId,
    pub mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanvasSurface {
    live: Option<LiveCanvas>,
    next_element_id: ElementId,
}

impl CanvasSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> Option<&LiveCanvas> {
        self.live.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.live.is_some()
    }

    /// Token of the placeholder currently on the surface, if one is live.
    pub fn live_placeholder(&self) -> Option<FallbackToken> {
        match self.live.as_ref()?.origin {
            CanvasOrigin::Placeholder(token) => Some(token),
            _ => None,
        }
    }

    pub fn export(&self) -> Option<DocumentExport> {
        self.live.as_ref()?.card.export()
    }

    pub fn render(&mut self, payload: CanvasPayload) -> Rendered {
        if let CanvasPayload::MonitorStream(frame) = &payload {
            if let Some(element_id) = self.update_monitor(frame) {
                return Rendered {
                    element_id,
                    mode: RenderMode::UpdatedInPlace,
                };
            }
        }
        let element_id = self.replace(CanvasOrigin::Payload, card_for(payload));
        Rendered {
            element_id,
            mode: RenderMode::Replaced,
        }
    }

    pub fn show_placeholder(&mut self, token: FallbackToken, tool: &str, detail: &str) -> ElementId {
        self.replace(
            CanvasOrigin::Placeholder(token),
            CanvasCard::Placeholder {
                tool: tool.to_string(),
                detail: detail.to_string(),
            },
        )
    }

    pub fn show_notice(&mut self, title: &str, detail: &str) -> ElementId {
        self.replace(
            CanvasOrigin::Notice,
            CanvasCard::Notice {
                title: title.to_string(),
                detail: detail.to_string(),
            },
        )
    }

    pub fn hide(&mut self) {
        self.live = None;
    }

    fn replace(&mut self, origin: CanvasOrigin, card: CanvasCard) -> ElementId {
        self.next_element_id += 1;
        let element_id = self.next_element_id;
        self.live = Some(LiveCanvas {
            element_id,
            origin,
            card,
        });
        element_id
    }

    fn update_monitor(&mut self, frame: &MonitorFrame) -> Option<ElementId> {
        let live = self.live.as_mut()?;
        match &mut live.card {
            CanvasCard::Monitor {
                frame: image,
                hud,
                stream_id,
                frames,
            } if *stream_id == frame.stream_id => {
                image.clone_from(&frame.image);
                hud.goal.clone_from(&frame.goal);
                hud.tool.clone_from(&frame.tool);
                hud.context.clone_from(&frame.context);
                *frames += 1;
                Some(live.element_id)
            }
            _ => None,
        }
    }
}

/// Dispatch table from payload discriminator to rendering routine.
fn card_for(payload: CanvasPayload) -> CanvasCard {
    match payload {
        CanvasPayload::ColorPalette(palette) => CanvasCard::Palette {
            swatches: palette.colors,
        },
        CanvasPayload::Ocr(ocr) => {
            CanvasCard::Document(DocumentExport::new("Extracted Text", ocr.text, BodyFormat::Text))
        }
        CanvasPayload::SearchResults(results) => search_results(results),
        CanvasPayload::WebPreview(preview) => web_preview(preview),
        CanvasPayload::MonitorStream(frame) => monitor(frame),
        CanvasPayload::SearchError(failure) => search_error(failure),
        CanvasPayload::PinPreview(pin) => pin_preview(pin),
        CanvasPayload::GenericDocument(document) => generic_document(document),
        CanvasPayload::Html(html) => {
            CanvasCard::Document(DocumentExport::new("Canvas", html, BodyFormat::Html))
        }
        CanvasPayload::Text(text) => {
            CanvasCard::Document(DocumentExport::new("Canvas Output", text, BodyFormat::Text))
        }
    }
}

fn search_results(results: SearchResults) -> CanvasCard {
    let links = results
        .results
        .into_iter()
        .map(|hit| ResultLink {
            host: display_host(&hit.url),
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet.filter(|snippet| !snippet.is_empty()),
        })
        .collect();
    CanvasCard::SearchResults {
        query: results.query,
        results: links,
    }
}

fn web_preview(preview: WebPreview) -> CanvasCard {
    let title = preview
        .title
        .or_else(|| preview.url.as_deref().and_then(display_host))
        .unwrap_or_else(|| "Web Preview".to_string());
    CanvasCard::WebPreview {
        title,
        html: preview.html,
        url: preview.url,
    }
}

fn monitor(frame: MonitorFrame) -> CanvasCard {
    CanvasCard::Monitor {
        frame: frame.image,
        hud: HudFields {
            goal: frame.goal,
            tool: frame.tool,
            context: frame.context,
        },
        stream_id: frame.stream_id,
        frames: 1,
    }
}

fn search_error(failure: SearchFailure) -> CanvasCard {
    CanvasCard::SearchError {
        query: failure.query,
        error: failure.error,
    }
}

fn pin_preview(pin: PinPreview) -> CanvasCard {
    CanvasCard::PinPreview {
        title: pin.title,
        image_url: pin.url,
    }
}

fn generic_document(document: GenericDocument) -> CanvasCard {
    let title = document
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| "Workspace".to_string());
    CanvasCard::Document(DocumentExport::new(title, document.body, BodyFormat::Markdown))
}

fn display_host(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
