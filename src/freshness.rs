//! `Last-Modified` fallback for articles whose page shows no usable time.
//!
//! The probe is best effort: timeouts, transport errors, a missing header or
//! an unparseable date all yield [`PublishedAt::Unknown`].

use crate::config::FreshnessSettings;
use crate::models::PublishedAt;
use chrono::DateTime;
use reqwest::Client;
use reqwest::header::LAST_MODIFIED;
use std::time::Duration;
use tracing::{debug, instrument};

/// Recovers a publication time from a resource's modification metadata.
pub trait FreshnessProbe {
    async fn last_modified(&self, url: &str) -> PublishedAt;
}

/// HTTP HEAD probe with a short timeout.
#[derive(Debug, Clone)]
pub struct HeadProbe {
    client: Client,
}

impl HeadProbe {
    pub fn new(settings: &FreshnessSettings, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self { client })
    }
}

impl FreshnessProbe for HeadProbe {
    #[instrument(level = "debug", skip(self))]
    async fn last_modified(&self, url: &str) -> PublishedAt {
        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "HEAD request failed");
                return PublishedAt::Unknown;
            }
        };

        match response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
        {
            Some(value) => parse_http_date(value),
            None => {
                debug!(status = response.status().as_u16(), "no Last-Modified header");
                PublishedAt::Unknown
            }
        }
    }
}

/// Parse an HTTP-date (`Wed, 01 May 2024 01:00:00 GMT`) into JST.
pub fn parse_http_date(value: &str) -> PublishedAt {
    DateTime::parse_from_rfc2822(value.trim())
        .map(PublishedAt::at)
        .unwrap_or(PublishedAt::Unknown)
}
