//! Yahoo! News Japan search adapter.
//!
//! Result items are `li` elements with generated class names
//! (`sc-1u4589e-0 ...`), so selectors match on class substrings. Times are
//! rendered as text such as `2024/5/1(水) 10:05`; the weekday marker is removed
//! by the normalizer. The publisher name lives in a nested span that sometimes
//! holds a comment count instead, hence the numeric check.

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

static CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"li[class*="sc-1u4589e-0"], li[class*="newsFeed_item"]"#).unwrap()
});
static TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class*="sc-3ls169-0"], div[class*="newsFeed_item_title"]"#).unwrap()
});
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static MEDIA: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"div.sc-n3vj8g-0.yoLqH div.sc-110wjhy-8.bsEjY span, [class*="newsFeed_item_media"]"#,
    )
    .unwrap()
});

#[derive(Debug)]
pub struct YahooNews;

impl YahooNews {
    fn candidate(&self, container: ElementRef<'_>) -> Result<RawCandidate, ExtractionFieldError> {
        let link = container
            .select(&LINK)
            .next()
            .ok_or(ExtractionFieldError::MissingLink)?;
        let url = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ExtractionFieldError::MissingLink)?
            .to_string();

        let title = container
            .select(&TITLE)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| Some(element_text(link)).filter(|t| !t.is_empty()))
            .ok_or(ExtractionFieldError::MissingTitle)?;

        let source_label = container
            .select(&MEDIA)
            .map(element_text)
            .find(|t| !t.is_empty() && !t.chars().all(|c| c.is_ascii_digit()))
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

impl SourceAdapter for YahooNews {
    fn kind(&self) -> SourceKind {
        SourceKind::Yahoo
    }

    fn base_origin(&self) -> &'static str {
        "https://news.yahoo.co.jp/"
    }

    fn fallback_source(&self) -> &'static str {
        "Yahoo"
    }

    fn render_request(&self, keyword: &str, settings: &RenderSettings) -> RenderRequest {
        RenderRequest {
            url: format!(
                "https://news.yahoo.co.jp/search?p={}&ei=utf-8&categories=domestic,world,business,it,science,life,local",
                urlencoding::encode(keyword)
            ),
            scroll_passes: 0,
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
        <html><body><ol>
          <li class="sc-1u4589e-0 kKmBYF">
            <a href="https://news.yahoo.co.jp/articles/abc123">
              <div class="sc-3ls169-0 dHAJpi">ホンダ、北米で
                 新工場</div>
              <div class="sc-n3vj8g-0 yoLqH">
                <time>2024/5/1(水) 10:05</time>
                <div class="sc-110wjhy-8 bsEjY"><span>12</span></div>
              </div>
              <span>朝日新聞デジタル</span>
            </a>
          </li>
          <li class="sc-1u4589e-0 kKmBYF">
            <a href="/articles/def456">ホンダ株が続伸</a>
            <div class="sc-n3vj8g-0 yoLqH">
              <div class="sc-110wjhy-8 bsEjY"><span>ロイター</span></div>
            </div>
          </li>
          <li class="sc-1u4589e-0 kKmBYF"><div class="sc-3ls169-0">Title only</div></li>
        </ol></body></html>
    "#;

    #[test]
    fn test_extracts_title_link_time_and_media() {
        let doc = Html::parse_document(PAGE);
        let candidates: Vec<RawCandidate> = YahooNews.extract(&doc).collect();
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].title, "ホンダ、北米で 新工場");
        assert_eq!(candidates[0].url, "https://news.yahoo.co.jp/articles/abc123");
        assert_eq!(
            candidates[0].time,
            Some(TimeHint::Label("2024/5/1(水) 10:05".to_string()))
        );
        // The media span holds a comment count, so the heuristic scan is used.
        assert_eq!(candidates[0].source_label.as_deref(), Some("朝日新聞デジタル"));
    }

    #[test]
    fn test_highlighted_keyword_keeps_title_intact() {
        let page = r#"
            <ol>
              <li class="sc-1u4589e-0 kKmBYF">
                <a href="https://news.yahoo.co.jp/articles/em1">
                  <div class="sc-3ls169-0 dHAJpi"><em>ホンダ</em>、北米で新工場</div>
                  <div class="sc-n3vj8g-0 yoLqH">
                    <div class="sc-110wjhy-8 bsEjY"><span>3</span></div>
                  </div>
                </a>
              </li>
            </ol>
        "#;
        let doc = Html::parse_document(page);
        let candidates: Vec<RawCandidate> = YahooNews.extract(&doc).collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "ホンダ、北米で新工場");
        assert_eq!(candidates[0].source_label, None);
    }

    #[test]
    fn test_title_falls_back_to_link_text() {
        let doc = Html::parse_document(PAGE);
        let candidates: Vec<RawCandidate> = YahooNews.extract(&doc).collect();

        assert_eq!(candidates[1].title, "ホンダ株が続伸");
        assert_eq!(candidates[1].url, "/articles/def456");
        assert_eq!(candidates[1].time, None);
        assert_eq!(candidates[1].source_label.as_deref(), Some("ロイター"));
    }
}
