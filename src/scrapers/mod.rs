//! News source adapters for extracting candidate records from rendered pages.
//!
//! Each source publishes search results with its own markup, and that markup
//! changes without notice. An adapter therefore never relies on a single
//! selector: every field is discovered through an ordered fallback chain of
//! small, independent steps, composed first-success-wins.
//!
//! # Supported Sources
//!
//! | Source | Module | Partition | Containers |
//! |--------|--------|-----------|------------|
//! | Google News | [`google`] | `Google` | `article` elements |
//! | Yahoo! News Japan | [`yahoo`] | `Yahoo` | result `li` elements |
//! | Bing / MSN News | [`bing`] | `MSN` | nearest `div`/`li` around a title anchor |
//!
//! # Time-label chain
//!
//! 1. machine-readable `time[datetime]` attribute
//! 2. text of a `time` element
//! 3. an `aria-label` that reads like a time
//! 4. a relative-time phrase found in the container's visible text
//!
//! When no chain step yields a label that normalizes, [`resolve_times`] asks a
//! [`FreshnessProbe`] for the article's `Last-Modified` header.

pub mod bing;
pub mod google;
pub mod yahoo;

use crate::config::{FreshnessSettings, RenderSettings};
use crate::freshness::FreshnessProbe;
use crate::models::{PublishedAt, RawCandidate, TimeHint};
use crate::render::RenderRequest;
use crate::sanitize::resolve_url;
use crate::temporal::{Rule, normalize};
use crate::utils::{collapse_whitespace, element_text, sole_text};
use chrono::{DateTime, FixedOffset};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Identity of a news source, and the dispatch table to its adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Google,
    Yahoo,
    Bing,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Google, SourceKind::Yahoo, SourceKind::Bing];

    pub fn adapter(self) -> &'static dyn SourceAdapter {
        match self {
            SourceKind::Google => &google::GoogleNews,
            SourceKind::Yahoo => &yahoo::YahooNews,
            SourceKind::Bing => &bing::BingNews,
        }
    }

    /// Store partition this source appends to.
    pub fn partition(self) -> &'static str {
        match self {
            SourceKind::Google => "Google",
            SourceKind::Yahoo => "Yahoo",
            SourceKind::Bing => "MSN",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Google => "google",
            SourceKind::Yahoo => "yahoo",
            SourceKind::Bing => "bing",
        };
        f.write_str(name)
    }
}

/// Extraction of candidate records from one source's rendered search page.
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Origin that site-relative links are resolved against.
    fn base_origin(&self) -> &'static str;

    /// Source label used when the markup yields nothing usable.
    fn fallback_source(&self) -> &'static str;

    /// Search page and interaction script for `keyword`.
    fn render_request(&self, keyword: &str, settings: &RenderSettings) -> RenderRequest;

    /// One lazy pass over the document's result containers. Unusable
    /// containers are skipped.
    fn extract<'a>(&'a self, document: &'a Html) -> Box<dyn Iterator<Item = RawCandidate> + 'a>;
}

/// Why a single container produced no candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFieldError {
    #[error("no title found")]
    MissingTitle,
    #[error("no link found")]
    MissingLink,
}

/// Log and drop a container that could not be turned into a candidate.
pub(crate) fn keep_usable(
    kind: SourceKind,
    result: Result<RawCandidate, ExtractionFieldError>,
) -> Option<RawCandidate> {
    match result {
        Ok(candidate) => Some(candidate),
        Err(e) => {
            debug!(source = %kind, reason = %e, "skipping container");
            None
        }
    }
}

static TIME_WITH_DATETIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time[datetime]").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static ARIA_LABELLED: Lazy<Selector> = Lazy::new(|| Selector::parse("[aria-label]").unwrap());
static SHORT_TEXT: Lazy<Selector> = Lazy::new(|| Selector::parse("span, div").unwrap());

static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9]+\s*(?:分|時間|日)前|[0-9]+\s*(?:minutes?|mins?|hours?|hrs?|days?)\s+ago")
        .unwrap()
});
pub(crate) static SOURCE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[・|•·]").unwrap());
static ON_PLATFORM_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+on\s+\S+$").unwrap());
static HAS_WORD_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ぁ-んァ-ン一-龥A-Za-z]").unwrap());

/// Step 1: machine-readable `datetime` attribute of a `time` element.
pub fn time_attribute(container: ElementRef<'_>) -> Option<String> {
    container
        .select(&TIME_WITH_DATETIME)
        .filter_map(|el| el.value().attr("datetime"))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Step 2: human-readable text of a `time` element.
pub fn time_text(container: ElementRef<'_>) -> Option<String> {
    container
        .select(&TIME)
        .map(element_text)
        .find(|t| !t.is_empty())
}

/// Step 3: an `aria-label` on a nearby element that reads like a time.
pub fn aria_time_label(container: ElementRef<'_>) -> Option<String> {
    container
        .select(&ARIA_LABELLED)
        .filter_map(|el| el.value().attr("aria-label"))
        .map(collapse_whitespace)
        .find(|label| looks_like_time(label))
}

/// Step 4: a relative-time phrase anywhere in the container's visible text.
/// Text nodes are space-separated here so digits never run together across
/// elements.
pub fn relative_time_in_text(container: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&container.text().collect::<Vec<_>>().join(" "));
    RELATIVE_TIME.find(&text).map(|m| m.as_str().to_string())
}

/// The shared time-label chain, first non-empty step wins.
pub fn discover_time_label(container: ElementRef<'_>) -> Option<String> {
    time_attribute(container)
        .or_else(|| time_text(container))
        .or_else(|| aria_time_label(container))
        .or_else(|| relative_time_in_text(container))
}

/// Whether `label` matches any rule the normalizer understands.
pub fn looks_like_time(label: &str) -> bool {
    Rule::detect(&label.trim().to_lowercase()).is_some()
}

/// Last step of every source-label chain: the first short `span`/`div` whose
/// whole content is one text node that contains letters or kana/kanji, is not
/// purely numeric, is not part of the title and is not itself a time.
pub fn heuristic_source_label(container: ElementRef<'_>, title: &str) -> Option<String> {
    container
        .select(&SHORT_TEXT)
        .filter_map(sole_text)
        .find(|text| {
            let len = text.chars().count();
            (2..=20).contains(&len)
                && !text.chars().all(|c| c.is_ascii_digit())
                && HAS_WORD_CHARS.is_match(text)
                && !title.contains(text.as_str())
                && !looks_like_time(text)
        })
}

/// Strip boilerplate from a discovered source label: an `on <platform>`
/// suffix, embedded relative times and separator glyphs.
pub fn clean_source_label(raw: &str) -> Option<String> {
    let without_time = RELATIVE_TIME.replace_all(raw, " ");
    let without_separators = SOURCE_SEPARATORS.replace_all(&without_time, " ");
    let collapsed = collapse_whitespace(&without_separators);
    let cleaned = ON_PLATFORM_SUFFIX.replace(&collapsed, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Resolve every candidate's time to a canonical value where possible.
///
/// A label that normalizes becomes [`TimeHint::Resolved`]. Candidates whose
/// label is missing or unrecognized are probed for `Last-Modified`
/// (concurrently, order preserved); a known probe result replaces the label.
/// Anything else is left for the sanitizer, which records `unknown`.
///
/// # Arguments
///
/// * `candidates` - Extracted candidates in page order
/// * `adapter` - Source the candidates came from; relative links are resolved
///   against its origin before probing
/// * `reference` - The run's reference time
/// * `probe` - `Last-Modified` lookup
/// * `settings` - Whether probing is enabled and how many probes run at once
///
/// # Returns
///
/// The same candidates in the same order, with times resolved where possible.
#[instrument(level = "info", skip_all, fields(source = %adapter.kind(), count = candidates.len()))]
pub async fn resolve_times<P: FreshnessProbe>(
    candidates: Vec<RawCandidate>,
    adapter: &dyn SourceAdapter,
    reference: DateTime<FixedOffset>,
    probe: &P,
    settings: &FreshnessSettings,
) -> Vec<RawCandidate> {
    let base_origin = adapter.base_origin();
    let enabled = settings.enabled;

    let resolved: Vec<RawCandidate> = stream::iter(candidates)
        .map(|mut candidate| async move {
            let from_label = match &candidate.time {
                Some(TimeHint::Label(label)) => normalize(label, reference),
                Some(TimeHint::Resolved(at)) => *at,
                None => PublishedAt::Unknown,
            };
            if from_label.is_known() {
                candidate.time = Some(TimeHint::Resolved(from_label));
                return candidate;
            }
            if !enabled {
                return candidate;
            }
            let Some(url) = resolve_url(&candidate.url, base_origin) else {
                return candidate;
            };
            let probed = probe.last_modified(&url).await;
            if probed.is_known() {
                debug!(%url, published_at = %probed, "time recovered from Last-Modified");
                candidate.time = Some(TimeHint::Resolved(probed));
            }
            candidate
        })
        .buffered(settings.concurrency.max(1))
        .collect()
        .await;

    let known = resolved
        .iter()
        .filter(|c| matches!(c.time, Some(TimeHint::Resolved(_))))
        .count();
    info!(resolved = known, total = resolved.len(), "Resolved publication times");
    resolved
}
