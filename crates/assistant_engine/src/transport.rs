use std::time::Duration;

use assistant_core::{BackendConfig, ChatRequest, HistoryEntry, ProviderSelection};
use assistant_logging::{assistant_debug, assistant_info};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{FailureKind, TransportError};

/// Raw response body, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request limit for chat streams. `None` lets a reply stream for as
    /// long as the backend keeps it open.
    pub request_timeout: Option<Duration>,
    /// Limit for side-channel calls (config, history, screenshot, ...).
    pub control_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            control_timeout: Duration::from_secs(30),
        }
    }
}

/// The assistant backend as seen by the client. Only the chat stream is
/// required; control calls default to `Unsupported`.
#[async_trait::async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;

    async fn fetch_config(&self) -> Result<BackendConfig, TransportError> {
        Err(TransportError::unsupported("config fetch"))
    }

    async fn set_hybrid_routing(&self, _enabled: bool) -> Result<(), TransportError> {
        Err(TransportError::unsupported("hybrid routing"))
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        Err(TransportError::unsupported("history fetch"))
    }

    async fn reset_history(&self) -> Result<(), TransportError> {
        Err(TransportError::unsupported("history reset"))
    }

    /// A screenshot of the backend host as a data URI.
    async fn capture_screenshot(&self) -> Result<String, TransportError> {
        Err(TransportError::unsupported("screenshot"))
    }

    async fn switch_provider(
        &self,
        _provider: &str,
        _model: Option<&str>,
    ) -> Result<ProviderSelection, TransportError> {
        Err(TransportError::unsupported("provider switch"))
    }

    /// Server-sent canvas broadcasts.
    async fn open_events(&self) -> Result<ByteStream, TransportError> {
        Err(TransportError::unsupported("event feed"))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct ScreenshotResponse {
    image: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    agent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base: Url,
    client: reqwest::Client,
    settings: TransportSettings,
}

impl HttpBackend {
    pub fn new(settings: TransportSettings) -> Result<Self, TransportError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(TransportError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base,
            client,
            settings,
        })
    }

    /// `GET /api/health`; returns the agent name when the backend reports one.
    pub async fn health(&self) -> Result<Option<String>, TransportError> {
        let health: HealthResponse = self.get_json("api/health").await?;
        Ok(health.agent)
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn control(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.timeout(self.settings.control_timeout)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.endpoint(path)?;
        let response = self
            .control(self.client.get(url))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(check_status(response).await?).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, TransportError> {
        let url = self.endpoint(path)?;
        let response = self
            .control(self.client.post(url).json(&body))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(check_status(response).await?).await
    }

    async fn open_stream(&self, builder: RequestBuilder) -> Result<ByteStream, TransportError> {
        let builder = match self.settings.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let response = check_status(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

#[async_trait::async_trait]
impl AssistantBackend for HttpBackend {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let url = self.endpoint("api/chat")?;
        assistant_debug!(
            "POST {} ({} chars, {} images)",
            url,
            request.message.chars().count(),
            request.images.len()
        );
        self.open_stream(self.client.post(url).json(request)).await
    }

    async fn fetch_config(&self) -> Result<BackendConfig, TransportError> {
        self.get_json("api/config").await
    }

    async fn set_hybrid_routing(&self, enabled: bool) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .post_json("api/config", json!({ "hybrid_routing": enabled }))
            .await?;
        Ok(())
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        let response: HistoryResponse = self.get_json("api/history").await?;
        Ok(response.history)
    }

    async fn reset_history(&self) -> Result<(), TransportError> {
        let _: serde_json::Value = self.post_json("api/reset", json!({})).await?;
        assistant_info!("backend history cleared");
        Ok(())
    }

    async fn capture_screenshot(&self) -> Result<String, TransportError> {
        let response: ScreenshotResponse = self.get_json("api/screenshot").await?;
        if !response.image.starts_with("data:") {
            return Err(TransportError::new(
                FailureKind::Decode,
                "screenshot is not a data URI",
            ));
        }
        Ok(response.image)
    }

    async fn switch_provider(
        &self,
        provider: &str,
        model: Option<&str>,
    ) -> Result<ProviderSelection, TransportError> {
        self.post_json("api/switch", json!({ "provider": provider, "model": model }))
            .await
    }

    async fn open_events(&self) -> Result<ByteStream, TransportError> {
        let url = self.endpoint("api/events")?;
        self.open_stream(self.client.get(url).header("Accept", "text/event-stream"))
            .await
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|error| error.detail)
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());
    let message = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    };
    let kind = if status == StatusCode::UNAUTHORIZED {
        FailureKind::Unauthorized
    } else {
        FailureKind::HttpStatus(status.as_u16())
    };
    Err(TransportError::new(kind, message))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    response
        .json::<T>()
        .await
        .map_err(|err| TransportError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return TransportError::new(FailureKind::Decode, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
