use std::time::{Duration, Instant};

use manimark_api_types::{ErrorBody, RenderRequest, RenderResponse};
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{info, warn};

use super::{
    info::{ParsedOptions, parse_info_string},
    media::{MediaBlob, MediaKind, extension_of, resolve_mime},
    surface::{Element, RenderSurface, SurfaceError},
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_FORMAT: &str = "mp4";
pub const DEFAULT_QUALITY: &str = "low";
pub const DEFAULT_SCENE: &str = "Scene";
pub const STATUS_IN_PROGRESS: &str = "Rendering Manim…";

const RENDER_PATH: &str = "render";

/// Connection settings and per-request defaults, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererOptions {
    pub server_url: String,
    pub default_format: String,
    pub default_quality: String,
    /// `None` waits for the server indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_format: DEFAULT_FORMAT.to_string(),
            default_quality: DEFAULT_QUALITY.to_string(),
            request_timeout: None,
        }
    }
}

impl From<&crate::config::RendererSettings> for RendererOptions {
    fn from(settings: &crate::config::RendererSettings) -> Self {
        Self {
            server_url: settings.server_url.clone(),
            default_format: settings.default_format.clone(),
            default_quality: settings.default_quality.clone(),
            request_timeout: settings.request_timeout,
        }
    }
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("invalid render server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failures absorbed by [`ManimRenderer::render`] and shown as `Render error: ...`.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(&'static str),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// What happened to a single render. Failures have already been shown on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { kind: MediaKind, filename: String },
    /// The server answered with a non-2xx status or `success: false`.
    Rejected { message: String },
    /// Transport, decoding or surface failure.
    Errored { message: String },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Rendered { .. } => "rendered",
            Self::Rejected { .. } => "rejected",
            Self::Errored { .. } => "errored",
        }
    }
}

enum Delivery {
    Media {
        kind: MediaKind,
        element: Element,
        filename: String,
    },
    Rejected(String),
}

/// Client for a Manim render server.
#[derive(Debug, Clone)]
pub struct ManimRenderer {
    client: Client,
    endpoint: Url,
    options: RendererOptions,
}

impl ManimRenderer {
    pub fn new(options: RendererOptions) -> Result<Self, RendererError> {
        let base = options
            .server_url
            .strip_suffix('/')
            .unwrap_or(&options.server_url);
        let endpoint = Url::parse(&format!("{base}/{RENDER_PATH}"))?;

        let mut builder = Client::builder().user_agent(Self::user_agent());
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint,
            options,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("manimark/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Combine annotation options with the configured defaults.
    pub fn build_request(&self, code: &str, parsed: &ParsedOptions) -> RenderRequest {
        RenderRequest {
            code: code.to_string(),
            scene: parsed
                .scene
                .clone()
                .unwrap_or_else(|| DEFAULT_SCENE.to_string()),
            format: parsed
                .format
                .clone()
                .unwrap_or_else(|| or_default(&self.options.default_format, DEFAULT_FORMAT)),
            quality: parsed
                .quality
                .clone()
                .unwrap_or_else(|| or_default(&self.options.default_quality, DEFAULT_QUALITY)),
        }
    }

    /// Render one fence into `surface`.
    ///
    /// A status node is attached before the request goes out. On success it is
    /// replaced by the media element; on failure it keeps the failure text.
    /// Nothing is returned as an error.
    pub async fn render<S>(&self, code: &str, info: &str, surface: &mut S) -> RenderOutcome
    where
        S: RenderSurface + ?Sized,
    {
        let started_at = Instant::now();
        let request = self.build_request(code, &parse_info_string(info));
        let status = surface.append_child(Element::status(STATUS_IN_PROGRESS));

        let outcome = match self.dispatch(&request, surface).await {
            Ok(Delivery::Media {
                kind,
                element,
                filename,
            }) => {
                surface.remove_child(status);
                surface.append_child(element);
                RenderOutcome::Rendered { kind, filename }
            }
            Ok(Delivery::Rejected(message)) => {
                surface.set_text(status, &format!("Render failed: {message}"));
                RenderOutcome::Rejected { message }
            }
            Err(err) => {
                let message = err.to_string();
                surface.set_text(status, &format!("Render error: {message}"));
                RenderOutcome::Errored { message }
            }
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        record_outcome(&outcome, elapsed_ms);
        match &outcome {
            RenderOutcome::Rendered { kind, filename } => info!(
                target = "application::render::manim",
                op = "manim::render",
                result = outcome.label(),
                elapsed_ms,
                scene = %request.scene,
                format = %request.format,
                quality = %request.quality,
                kind = kind.as_str(),
                filename = %filename,
                "Manim scene rendered"
            ),
            RenderOutcome::Rejected { message } | RenderOutcome::Errored { message } => warn!(
                target = "application::render::manim",
                op = "manim::render",
                result = outcome.label(),
                elapsed_ms,
                scene = %request.scene,
                format = %request.format,
                quality = %request.quality,
                error = %message,
                "Manim render failed"
            ),
        }

        outcome
    }

    async fn dispatch<S>(
        &self,
        request: &RenderRequest,
        surface: &mut S,
    ) -> Result<Delivery, DispatchError>
    where
        S: RenderSurface + ?Sized,
    {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let error_body: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            let message = error_body
                .message()
                .unwrap_or_else(|| format!("Server returned {}", status.as_u16()));
            return Ok(Delivery::Rejected(message));
        }

        let parsed: RenderResponse = serde_json::from_slice(&body)?;
        if !parsed.success {
            let message = parsed
                .error_message()
                .unwrap_or_else(|| "unknown".to_string());
            return Ok(Delivery::Rejected(message));
        }

        let filename = parsed
            .filename
            .ok_or(DispatchError::MalformedResponse("missing filename"))?;
        let data = parsed
            .data
            .ok_or(DispatchError::MalformedResponse("missing data"))?;

        let extension = extension_of(&filename);
        let mime = resolve_mime(extension.as_deref(), &request.format);
        let blob = MediaBlob::from_base64(&data, mime)?;
        let url = surface.create_object_url(&blob)?;

        let kind = MediaKind::from_extension(extension.as_deref());
        let element = match kind {
            MediaKind::Video => Element::Video { src: url },
            MediaKind::Image => Element::Image { src: url },
            MediaKind::Download => Element::DownloadLink {
                href: url,
                label: format!("Download {filename}"),
                filename: filename.clone(),
            },
        };

        Ok(Delivery::Media {
            kind,
            element,
            filename,
        })
    }
}

fn or_default(configured: &str, fallback: &str) -> String {
    if configured.is_empty() {
        fallback.to_string()
    } else {
        configured.to_string()
    }
}

fn record_outcome(outcome: &RenderOutcome, elapsed_ms: u64) {
    metrics::counter!("manimark_render_total", "result" => outcome.label()).increment(1);
    metrics::histogram!("manimark_render_ms").record(elapsed_ms as f64);
}
