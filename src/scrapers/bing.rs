//! Bing News (MSN) search adapter.
//!
//! Bing has shipped two card layouts: the older one with `a.title` anchors and
//! the newer one with `a[data-title]`. Both are matched, and each anchor's
//! nearest `div`/`li` ancestor is treated as its container. The container's
//! `.source` element reads like `"Car Watch ・ 2時間前"`, which yields both the
//! publisher and a relative time label.

use super::{
    ExtractionFieldError, SOURCE_SEPARATORS, SourceAdapter, SourceKind, clean_source_label,
    discover_time_label, heuristic_source_label, keep_usable,
};
use crate::config::RenderSettings;
use crate::models::{RawCandidate, TimeHint};
use crate::render::RenderRequest;
use crate::utils::element_text;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a.title, a[data-title]").unwrap());
static SOURCE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.source, span.source").unwrap());

#[derive(Debug)]
pub struct BingNews;

/// Nearest `div` or `li` ancestor, else the parent element, else the anchor.
fn container_of(anchor: ElementRef<'_>) -> ElementRef<'_> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "div" | "li"))
        .or_else(|| anchor.parent().and_then(ElementRef::wrap))
        .unwrap_or(anchor)
}

/// Split a `"<source> ・ <time>"` line into its parts.
fn split_source_line(text: &str) -> (Option<String>, Option<String>) {
    let parts = SOURCE_SEPARATORS
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect_vec();
    (
        parts.first().map(|p| p.to_string()),
        parts.get(1).map(|p| p.to_string()),
    )
}

impl BingNews {
    fn candidate(&self, anchor: ElementRef<'_>) -> Result<RawCandidate, ExtractionFieldError> {
        let title = anchor
            .value()
            .attr("data-title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| Some(element_text(anchor)).filter(|t| !t.is_empty()))
            .ok_or(ExtractionFieldError::MissingTitle)?;
        let url = anchor
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ExtractionFieldError::MissingLink)?
            .to_string();

        let container = container_of(anchor);
        let (line_source, line_time) = container
            .select(&SOURCE)
            .map(element_text)
            .find(|t| !t.is_empty())
            .map(|line| split_source_line(&line))
            .unwrap_or((None, None));

        let time = line_time
            .or_else(|| discover_time_label(container))
            .map(TimeHint::Label);

        let source_label = line_source
            .and_then(|raw| clean_source_label(&raw))
            .or_else(|| {
                heuristic_source_label(container, &title).and_then(|raw| clean_source_label(&raw))
            });

        Ok(RawCandidate {
            title,
            url,
            time,
            source_label,
        })
    }
}

impl SourceAdapter for BingNews {
    fn kind(&self) -> SourceKind {
        SourceKind::Bing
    }

    fn base_origin(&self) -> &'static str {
        "https://www.bing.com/"
    }

    fn fallback_source(&self) -> &'static str {
        "MSN"
    }

    fn render_request(&self, keyword: &str, settings: &RenderSettings) -> RenderRequest {
        RenderRequest {
            url: format!(
                "https://www.bing.com/news/search?q={}&qft=sortbydate%3D%271%27&setlang=ja&cc=JP&FORM=HDRSC6",
                urlencoding::encode(keyword)
            ),
            scroll_passes: 4,
            consent_selector: Some("#bnp_btn_accept".to_string()),
            wait_selector: Some("a.title, a[data-title]".to_string()),
            settle: Duration::from_millis(settings.settle_ms),
        }
    }

    fn extract<'a>(&'a self, document: &'a Html) -> Box<dyn Iterator<Item = RawCandidate> + 'a> {
        Box::new(
            document
                .select(&ANCHOR)
                .filter_map(move |anchor| keep_usable(self.kind(), self.candidate(anchor))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="news-card newsitem cardcommon">
            <div class="caption">
              <a class="title" href="https://car.watch.impress.co.jp/docs/news/1.html">ホンダ、新型SUVを公開</a>
              <div class="source"><span>Car Watch</span> ・ <span>2時間前</span></div>
            </div>
          </div>
          <li class="card">
            <a data-title="ホンダ 二輪 販売好調" href="https://www.msn.com/ja-jp/news/2">ignored text</a>
            <span>日本経済新聞 on MSN</span>
            <time datetime="2024-05-01T00:00:00Z"></time>
          </li>
          <div><a class="title" href="">Empty href</a></div>
          <div><a class="title" href="https://example.com/x">  </a></div>
        </body></html>
    "#;

    #[test]
    fn test_source_line_provides_source_and_time() {
        let doc = Html::parse_document(PAGE);
        let candidates: Vec<RawCandidate> = BingNews.extract(&doc).collect();
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].title, "ホンダ、新型SUVを公開");
        assert_eq!(candidates[0].source_label.as_deref(), Some("Car Watch"));
        assert_eq!(candidates[0].time, Some(TimeHint::Label("2時間前".to_string())));
    }

    #[test]
    fn test_data_title_layout_with_fallbacks() {
        let doc = Html::parse_document(PAGE);
        let candidates: Vec<RawCandidate> = BingNews.extract(&doc).collect();

        assert_eq!(candidates[1].title, "ホンダ 二輪 販売好調");
        assert_eq!(candidates[1].url, "https://www.msn.com/ja-jp/news/2");
        assert_eq!(
            candidates[1].time,
            Some(TimeHint::Label("2024-05-01T00:00:00Z".to_string()))
        );
        assert_eq!(candidates[1].source_label.as_deref(), Some("日本経済新聞"));
    }

    #[test]
    fn test_split_source_line() {
        assert_eq!(
            split_source_line("Reuters · 1 hour ago"),
            (Some("Reuters".to_string()), Some("1 hour ago".to_string()))
        );
        assert_eq!(split_source_line("Reuters"), (Some("Reuters".to_string()), None));
        assert_eq!(split_source_line(" ・ "), (None, None));
    }

    #[test]
    fn test_render_request_dismisses_consent() {
        let req = BingNews.render_request("マツダ", &RenderSettings::default());
        assert_eq!(req.consent_selector.as_deref(), Some("#bnp_btn_accept"));
        assert_eq!(req.scroll_passes, 4);
        assert!(req.url.contains("sortbydate"));
    }
}
