//! Google News search adapter.
//!
//! Results are rendered as `article` elements. The headline link carries the
//! `JtKRv` class and a site-relative `./read/...` or `./articles/...` href; the
//! publication time is a `time` element with an ISO-8601 `datetime`
//! attribute; the publisher name sits in a `div.vr1PYe`.

use super::{
    ExtractionFieldError, SourceAdapter, SourceKind, clean_source_label, discover_time_label,
    heuristic_source_label, keep_usable,
};
use crate::config::RenderSettings;
use crate::models::{RawCandidate, TimeHint};
use crate::render::RenderRequest;
use crate::utils::element_text;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

static CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static HEADLINE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.JtKRv[href]").unwrap());
static ARTICLE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="/articles/"], a[href*="/read/"]"#).unwrap()
});
static PUBLISHER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.vr1PYe, [data-n-tid]").unwrap());

#[derive(Debug)]
pub struct GoogleNews;

impl GoogleNews {
    fn candidate(&self, container: ElementRef<'_>) -> Result<RawCandidate, ExtractionFieldError> {
        let link = container
            .select(&HEADLINE)
            .next()
            .or_else(|| {
                container
                    .select(&ARTICLE_LINK)
                    .find(|a| !element_text(*a).is_empty())
            })
            .ok_or(ExtractionFieldError::MissingLink)?;

        let url = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ExtractionFieldError::MissingLink)?
            .to_string();

        let title = Some(element_text(link))
            .filter(|t| !t.is_empty())
            .or_else(|| link.value().attr("aria-label").map(str::trim).map(str::to_string))
            .filter(|t| !t.is_empty())
            .ok_or(ExtractionFieldError::MissingTitle)?;

        let source_label = container
            .select(&PUBLISHER)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| heuristic_source_label(container, &title))
            .and_then(|raw| clean_source_label(&raw));

        Ok(RawCandidate {
            title,
            url,
            time: discover_time_label(container).map(TimeHint::Label),
            source_label,
        })
    }
}

impl SourceAdapter for GoogleNews {
    fn kind(&self) -> SourceKind {
        SourceKind::Google
    }

    fn base_origin(&self) -> &'static str {
        "https://news.google.com/"
    }

    fn fallback_source(&self) -> &'static str {
        "Google"
    }

    fn render_request(&self, keyword: &str, settings: &RenderSettings) -> RenderRequest {
        RenderRequest {
            url: format!(
                "https://news.google.com/search?q={}&hl=ja&gl=JP&ceid=JP:ja",
                urlencoding::encode(keyword)
            ),
            scroll_passes: 3,
            consent_selector: None,
            wait_selector: None,
            settle: Duration::from_millis(settings.settle_ms),
        }
    }

    fn extract<'a>(&'a self, document: &'a Html) -> Box<dyn Iterator<Item = RawCandidate> + 'a> {
        Box::new(
            document
                .select(&CONTAINER)
                .filter_map(move |container| keep_usable(self.kind(), self.candidate(container))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><main>
          <article>
            <div class="vr1PYe">Response</div>
            <a class="JtKRv" href="./read/CBMiAAA?hl=ja">ホンダ、新型EVを発表</a>
            <time class="hvbAAd" datetime="2024-05-01T00:30:00Z">9時間前</time>
          </article>
          <article>
            <a class="WwrzSb" href="./articles/CBMiBBB" aria-label="ignored"></a>
            <a href="./articles/CBMiBBB">ホンダ 決算 速報</a>
            <span>日刊工業新聞</span>
            <span aria-label="3 hours ago"></span>
          </article>
          <article>
            <div class="vr1PYe">No link here</div>
          </article>
        </main></body></html>
    "#;

    #[test]
    fn test_extracts_candidates_and_skips_unusable_containers() {
        let doc = Html::parse_document(PAGE);
        let candidates: Vec<RawCandidate> = GoogleNews.extract(&doc).collect();
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].title, "ホンダ、新型EVを発表");
        assert_eq!(candidates[0].url, "./read/CBMiAAA?hl=ja");
        assert_eq!(
            candidates[0].time,
            Some(TimeHint::Label("2024-05-01T00:30:00Z".to_string()))
        );
        assert_eq!(candidates[0].source_label.as_deref(), Some("Response"));
    }

    #[test]
    fn test_renamed_markup_uses_fallbacks() {
        let doc = Html::parse_document(PAGE);
        let candidates: Vec<RawCandidate> = GoogleNews.extract(&doc).collect();

        assert_eq!(candidates[1].title, "ホンダ 決算 速報");
        assert_eq!(candidates[1].url, "./articles/CBMiBBB");
        assert_eq!(
            candidates[1].time,
            Some(TimeHint::Label("3 hours ago".to_string()))
        );
        assert_eq!(candidates[1].source_label.as_deref(), Some("日刊工業新聞"));
    }

    #[test]
    fn test_render_request_encodes_keyword() {
        let req = GoogleNews.render_request("ホンダ", &RenderSettings::default());
        assert!(req.url.starts_with("https://news.google.com/search?q=%E3%83%9B"));
        assert_eq!(req.scroll_passes, 3);
    }
}
