//! Page rendering collaborator.
//!
//! The pipeline consumes rendered markup through the [`Renderer`] trait and
//! never drives a browser itself. A [`RenderRequest`] carries the page URL
//! together with the minimum interaction script a browser-backed renderer
//! would run (scroll passes, consent dismissal, wait-for-selector).
//!
//! [`HttpRenderer`] fetches the server-rendered HTML with a desktop browser
//! user agent. It cannot execute the interaction script; it logs it so a run
//! that returns a thin page can be diagnosed.

use crate::config::RenderSettings;
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// A page to render and the interaction needed before its markup is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub url: String,
    /// Number of scroll-to-bottom passes to trigger lazy loading.
    pub scroll_passes: u32,
    /// Element to click if a consent dialog appears.
    pub consent_selector: Option<String>,
    /// Element whose presence signals that results have loaded.
    pub wait_selector: Option<String>,
    /// Pause after load and between scroll passes.
    pub settle: Duration,
}

/// The source could not be rendered into a usable document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned an empty document")]
    Empty { url: String },
}

/// Produces final document markup for a [`RenderRequest`].
pub trait Renderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, RenderError>;
}

/// Renderer that fetches server-side HTML over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(settings: &RenderSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Renderer for HttpRenderer {
    #[instrument(level = "info", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let t0 = Instant::now();
        if request.scroll_passes > 0
            || request.consent_selector.is_some()
            || request.wait_selector.is_some()
        {
            debug!(
                scroll_passes = request.scroll_passes,
                consent = ?request.consent_selector,
                wait_for = ?request.wait_selector,
                "interaction script not executed by HTTP renderer"
            );
        }

        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|source| RenderError::Transport {
                url: request.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "render request rejected");
            return Err(RenderError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| RenderError::Transport {
                url: request.url.clone(),
                source,
            })?;
        if body.trim().is_empty() {
            return Err(RenderError::Empty {
                url: request.url.clone(),
            });
        }

        info!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Rendered page"
        );
        Ok(body)
    }
}
