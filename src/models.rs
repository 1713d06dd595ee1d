//! Data models for scraped candidates and the articles persisted to the store.
//!
//! This module defines the records that flow through the pipeline:
//! - [`RawCandidate`]: Unsanitized record produced by a source adapter
//! - [`TimeHint`]: Publication time as found in the markup, or already resolved
//! - [`PublishedAt`]: Canonical JST timestamp or the `unknown` sentinel
//! - [`Article`]: Sanitized record, one store row
//!
//! Every stage takes its input by value and hands a new value to the next one.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Offset all publication times are normalized to (JST, UTC+9).
pub const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Display format of a canonical timestamp.
pub const CANONICAL_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Sentinel written to the store when no publication time could be derived.
pub const UNKNOWN_SENTINEL: &str = "unknown";

/// Header row written when a partition is created.
pub const STORE_HEADER: [&str; 4] = ["title", "url", "published_at", "source"];

/// One row of the tabular store, in [`STORE_HEADER`] column order.
pub type Row = Vec<String>;

/// The fixed +09:00 offset.
pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current instant in JST. Called once per run; everything downstream takes
/// the result as an explicit reference time.
pub fn reference_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&jst())
}

/// A publication time in canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedAt {
    /// A known instant, held in JST.
    At(DateTime<FixedOffset>),
    /// No format matched or the value could not be recovered.
    Unknown,
}

impl PublishedAt {
    /// Wrap any instant, shifting it to JST.
    pub fn at<Tz: chrono::TimeZone>(dt: DateTime<Tz>) -> Self {
        PublishedAt::At(dt.with_timezone(&jst()))
    }

    pub fn is_known(&self) -> bool {
        matches!(self, PublishedAt::At(_))
    }
}

impl fmt::Display for PublishedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedAt::At(dt) => write!(f, "{}", dt.format(CANONICAL_FORMAT)),
            PublishedAt::Unknown => f.write_str(UNKNOWN_SENTINEL),
        }
    }
}

impl Serialize for PublishedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Publication time as carried by a [`RawCandidate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeHint {
    /// Free-form text: relative phrase, absolute date, ISO-8601 instant or clock time.
    Label(String),
    /// Already canonical (ISO attribute or `Last-Modified` probe).
    Resolved(PublishedAt),
}

/// An unsanitized record extracted from one container of a rendered page.
///
/// Adapters never yield a candidate without a title and a link; those are
/// skipped during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub url: String,
    pub time: Option<TimeHint>,
    pub source_label: Option<String>,
}

/// A sanitized article. `url` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub published_at: PublishedAt,
    pub source: String,
}

impl Article {
    /// Store row in [`STORE_HEADER`] order.
    pub fn into_row(self) -> Row {
        vec![
            self.title,
            self.url,
            self.published_at.to_string(),
            self.source,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_published_at_display() {
        let dt = jst().with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(PublishedAt::At(dt).to_string(), "2024/05/01 08:30");
        assert_eq!(PublishedAt::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_published_at_shifts_to_jst() {
        let utc = Utc.with_ymd_and_hms(2024, 4, 30, 23, 15, 0).unwrap();
        assert_eq!(PublishedAt::at(utc).to_string(), "2024/05/01 08:15");
    }

    #[test]
    fn test_article_into_row_column_order() {
        let article = Article {
            title: "Title".to_string(),
            url: "https://example.com/a".to_string(),
            published_at: PublishedAt::Unknown,
            source: "Example".to_string(),
        };
        assert_eq!(
            article.into_row(),
            vec!["Title", "https://example.com/a", "unknown", "Example"]
        );
    }

    #[test]
    fn test_article_serializes_canonical_timestamp() {
        let dt = jst().with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        let article = Article {
            title: "T".to_string(),
            url: "https://example.com/t".to_string(),
            published_at: PublishedAt::At(dt),
            source: "S".to_string(),
        };
        let json = serde_json::to_string(&article).unwrap();
        assert!(json.contains("\"published_at\":\"2024/05/01 07:00\""));
    }
}
