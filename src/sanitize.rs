//! Turns raw candidates into [`Article`]s.

use crate::models::{Article, PublishedAt, RawCandidate, TimeHint};
use crate::scrapers::SourceAdapter;
use crate::temporal::normalize;
use crate::utils::collapse_whitespace;
use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty title")]
    MissingTitle,
    #[error("empty url")]
    MissingUrl,
    #[error("not an absolute http(s) url: {0}")]
    InvalidUrl(String),
}

/// Make `raw` absolute. Links beginning with `./`, `../` or `/` are joined
/// against `base_origin`; anything else must already be an absolute http(s)
/// URL and is returned trimmed but otherwise untouched.
pub fn resolve_url(raw: &str, base_origin: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let relative = raw.starts_with("./") || raw.starts_with("../") || raw.starts_with('/');
    let parsed = if relative {
        Url::parse(base_origin).ok()?.join(raw).ok()?
    } else {
        Url::parse(raw).ok()?
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    Some(if relative { parsed.to_string() } else { raw.to_string() })
}

/// Validate and normalize one candidate from `adapter`'s page.
///
/// A missing or unparseable time never rejects; it is recorded as unknown.
pub fn sanitize(
    candidate: RawCandidate,
    adapter: &dyn SourceAdapter,
    reference: DateTime<FixedOffset>,
) -> Result<Article, Rejection> {
    let title = collapse_whitespace(&candidate.title);
    if title.is_empty() {
        return Err(Rejection::MissingTitle);
    }

    let raw_url = candidate.url.trim();
    if raw_url.is_empty() {
        return Err(Rejection::MissingUrl);
    }
    let url = resolve_url(raw_url, adapter.base_origin())
        .ok_or_else(|| Rejection::InvalidUrl(raw_url.to_string()))?;

    let published_at = match candidate.time {
        Some(TimeHint::Resolved(at)) => at,
        Some(TimeHint::Label(label)) => normalize(&label, reference),
        None => PublishedAt::Unknown,
    };

    let source = candidate
        .source_label
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| adapter.fallback_source().to_string());

    Ok(Article {
        title,
        url,
        published_at,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::jst;
    use crate::scrapers::SourceKind;
    use chrono::TimeZone;

    fn reference() -> DateTime<FixedOffset> {
        jst().with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn candidate(title: &str, url: &str) -> RawCandidate {
        RawCandidate {
            title: title.to_string(),
            url: url.to_string(),
            time: None,
            source_label: None,
        }
    }

    #[test]
    fn test_rejects_empty_title_and_url() {
        let adapter = SourceKind::Google.adapter();
        assert_eq!(
            sanitize(candidate("  \n ", "https://a/1"), adapter, reference()),
            Err(Rejection::MissingTitle)
        );
        assert_eq!(
            sanitize(candidate("Title", "   "), adapter, reference()),
            Err(Rejection::MissingUrl)
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let adapter = SourceKind::Bing.adapter();
        assert!(matches!(
            sanitize(candidate("Title", "javascript:void(0)"), adapter, reference()),
            Err(Rejection::InvalidUrl(_))
        ));
        assert!(matches!(
            sanitize(candidate("Title", "articles/abc"), adapter, reference()),
            Err(Rejection::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_relative_links_join_base_origin() {
        assert_eq!(
            resolve_url("./articles/CBMi?hl=ja", "https://news.google.com/").as_deref(),
            Some("https://news.google.com/articles/CBMi?hl=ja")
        );
        assert_eq!(
            resolve_url("/articles/abc", "https://news.yahoo.co.jp/").as_deref(),
            Some("https://news.yahoo.co.jp/articles/abc")
        );
        assert_eq!(
            resolve_url("../read/xyz", "https://news.google.com/").as_deref(),
            Some("https://news.google.com/read/xyz")
        );
    }

    #[test]
    fn test_absolute_url_is_kept_verbatim() {
        assert_eq!(
            resolve_url("  https://Example.com/a?b=1  ", "https://news.google.com/").as_deref(),
            Some("https://Example.com/a?b=1")
        );
        assert_eq!(resolve_url("ftp://example.com/a", "https://www.bing.com/"), None);
        assert_eq!(resolve_url("", "https://www.bing.com/"), None);
    }

    #[test]
    fn test_sanitize_normalizes_fields() {
        let adapter = SourceKind::Google.adapter();
        let raw = RawCandidate {
            title: "  ホンダ、\n  新型EVを発表 ".to_string(),
            url: "./articles/abc".to_string(),
            time: Some(TimeHint::Label("90分前".to_string())),
            source_label: Some("  日経 ".to_string()),
        };
        let article = sanitize(raw, adapter, reference()).unwrap();
        assert_eq!(article.title, "ホンダ、 新型EVを発表");
        assert_eq!(article.url, "https://news.google.com/articles/abc");
        assert_eq!(article.published_at.to_string(), "2024/05/01 08:30");
        assert_eq!(article.source, "日経");
    }

    #[test]
    fn test_sanitize_keeps_resolved_time_and_falls_back_on_source() {
        let adapter = SourceKind::Bing.adapter();
        let at = PublishedAt::at(jst().with_ymd_and_hms(2024, 4, 30, 23, 15, 0).unwrap());
        let raw = RawCandidate {
            time: Some(TimeHint::Resolved(at)),
            source_label: Some("   ".to_string()),
            ..candidate("Title", "https://example.com/a")
        };
        let article = sanitize(raw, adapter, reference()).unwrap();
        assert_eq!(article.published_at, at);
        assert_eq!(article.source, "MSN");
    }

    #[test]
    fn test_missing_or_garbage_time_is_unknown() {
        let adapter = SourceKind::Yahoo.adapter();
        let article = sanitize(candidate("Title", "https://a/1"), adapter, reference()).unwrap();
        assert_eq!(article.published_at, PublishedAt::Unknown);

        let raw = RawCandidate {
            time: Some(TimeHint::Label("さきほど".to_string())),
            ..candidate("Title", "https://a/2")
        };
        let article = sanitize(raw, adapter, reference()).unwrap();
        assert_eq!(article.published_at.to_string(), "unknown");
        assert_eq!(article.source, "Yahoo");
    }
}
