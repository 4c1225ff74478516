//! Scraped adapter for a single HTML listing page.
//!
//! The page is fetched once and run through an ordered list of candidate
//! selectors; the first selector that matches anything is used and the rest
//! are ignored. From each candidate we take a headline, a link (resolved
//! against the source's base URL) and, if present, a summary paragraph.
//!
//! # Example
//!
//! For BBC the primary selector is `div[data-testid="edinburgh-card"]` and
//! the fallback is a bare `article`, so a redesign that drops the test ids
//! degrades to the generic selector instead of yielding nothing.

use super::{SourceAdapter, fetch_text, parse_published_date};
use crate::config::PageSourceSpec;
use crate::error::SourceError;
use crate::models::NewsItem;
use crate::utils::clean_text;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug)]
pub struct PageAdapter {
    spec: PageSourceSpec,
    base: Url,
    client: Client,
}

/// Selectors compiled for one extraction pass.
struct Compiled {
    candidates: Vec<(String, Selector)>,
    titles: Vec<Selector>,
    link: Selector,
    summary: Selector,
    time: Selector,
}

fn compile(raw: &str) -> Result<Selector, SourceError> {
    Selector::parse(raw).map_err(|e| SourceError::Config(format!("invalid selector {raw:?}: {e}")))
}

impl PageAdapter {
    /// Validate the spec up front: the base URL must parse and every
    /// selector must compile.
    pub fn new(spec: PageSourceSpec, client: Client) -> Result<Self, SourceError> {
        let base_raw = spec.base_url.as_deref().unwrap_or(&spec.url);
        let base = Url::parse(base_raw)
            .map_err(|e| SourceError::Config(format!("invalid base URL {base_raw:?}: {e}")))?;
        if spec.candidate_selectors.is_empty() {
            return Err(SourceError::Config("no candidate selectors".to_string()));
        }
        let adapter = Self { spec, base, client };
        adapter.compile()?;
        Ok(adapter)
    }

    fn compile(&self) -> Result<Compiled, SourceError> {
        Ok(Compiled {
            candidates: self
                .spec
                .candidate_selectors
                .iter()
                .map(|s| compile(s).map(|sel| (s.clone(), sel)))
                .collect::<Result<_, _>>()?,
            titles: self
                .spec
                .title_selectors
                .iter()
                .map(|s| compile(s))
                .collect::<Result<_, _>>()?,
            link: compile(&self.spec.link_selector)?,
            summary: compile(&self.spec.summary_selector)?,
            time: compile("time[datetime]")?,
        })
    }

    /// Extract drafts from a fetched page.
    ///
    /// Fails with [`SourceError::Parse`] only when no candidate selector
    /// matches at all; individual candidates missing a headline or link are
    /// skipped.
    pub fn extract(&self, html: &str) -> Result<Vec<NewsItem>, SourceError> {
        let sel = self.compile()?;
        let document = Html::parse_document(html);

        let mut chosen: Option<(&str, Vec<ElementRef<'_>>)> = None;
        for (raw, selector) in &sel.candidates {
            let found: Vec<ElementRef<'_>> = document.select(selector).collect();
            if !found.is_empty() {
                chosen = Some((raw.as_str(), found));
                break;
            }
            debug!(selector = %raw, "Candidate selector matched nothing; trying next");
        }
        let Some((used, candidates)) = chosen else {
            return Err(SourceError::Parse(format!(
                "no candidates matched any of {:?}",
                self.spec.candidate_selectors
            )));
        };
        debug!(selector = %used, count = candidates.len(), "Using candidate selector");

        let keywords: Vec<String> = self.spec.keywords.iter().map(|k| k.to_lowercase()).collect();
        let drafts: Vec<NewsItem> = candidates
            .into_iter()
            .filter_map(|el| self.extract_one(&sel, el))
            .filter(|item| {
                keywords.is_empty() || {
                    let title = item.title_original.to_lowercase();
                    keywords.iter().any(|k| title.contains(k))
                }
            })
            .take(self.spec.max_items)
            .collect();
        Ok(drafts)
    }

    fn extract_one(&self, sel: &Compiled, el: ElementRef<'_>) -> Option<NewsItem> {
        let title_el = sel.titles.iter().find_map(|s| {
            el.select(s)
                .find(|t| !clean_text(&t.text().collect::<String>()).is_empty())
        });
        let Some(title_el) = title_el else {
            debug!("Candidate has no headline; skipping");
            return None;
        };
        let title = clean_text(&title_el.text().collect::<String>());

        let href = std::iter::once(title_el)
            .filter(|t| t.value().name() == "a")
            .chain(title_el.select(&sel.link))
            .chain(el.select(&sel.link))
            .chain(std::iter::once(el).filter(|c| c.value().name() == "a"))
            .find_map(|a| a.value().attr("href"));
        let Some(href) = href else {
            debug!(%title, "Candidate has no link; skipping");
            return None;
        };
        let url = match self.base.join(href.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u.to_string(),
            Ok(u) => {
                debug!(%title, url = %u, "Candidate link is not http(s); skipping");
                return None;
            }
            Err(e) => {
                debug!(%title, %href, error = %e, "Candidate link does not resolve; skipping");
                return None;
            }
        };

        let summary = el
            .select(&sel.summary)
            .map(|p| clean_text(&p.text().collect::<String>()))
            .find(|p| !p.is_empty() && *p != title)
            .unwrap_or_default();

        let published = el
            .select(&sel.time)
            .filter_map(|t| t.value().attr("datetime"))
            .find_map(parse_published_date);

        NewsItem::draft(
            &title,
            &summary,
            &url,
            &self.spec.name,
            self.spec.origin_tag,
            published,
        )
    }
}

#[async_trait]
impl SourceAdapter for PageAdapter {
    fn name(&self) -> &str {
        &self.spec.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.spec.name, url = %self.spec.url))]
    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError> {
        let html = fetch_text(&self.client, &self.spec.url).await?;
        match self.extract(&html) {
            Ok(drafts) => {
                info!(count = drafts.len(), "Scraped page");
                Ok(drafts)
            }
            Err(e) => {
                warn!(error = %e, bytes = html.len(), "Page structure not recognized");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OriginTag;
    use crate::sources::tests::{local_client, serve};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn spec(candidates: &[&str], titles: &[&str]) -> PageSourceSpec {
        PageSourceSpec {
            name: "BBC News".to_string(),
            url: "https://www.bbc.com/news/topics/c8nq32jw5r7t".to_string(),
            base_url: None,
            origin_tag: OriginTag::International,
            candidate_selectors: candidates.iter().map(|s| s.to_string()).collect(),
            title_selectors: titles.iter().map(|s| s.to_string()).collect(),
            link_selector: "a[href]".to_string(),
            summary_selector: "p".to_string(),
            max_items: 3,
            keywords: vec![],
        }
    }

    fn adapter(spec: PageSourceSpec) -> PageAdapter {
        let client = crate::sources::http_client(Duration::from_secs(1)).unwrap();
        PageAdapter::new(spec, client).unwrap()
    }

    const CARDS: &str = r#"
        <html><body>
          <div data-testid="edinburgh-card">
            <a href="/news/articles/c1"><h2>Junta extends
                emergency rule</h2></a>
            <p>Military leaders extended the state of emergency.</p>
            <time datetime="2025-05-06T08:00:00Z">6 May</time>
          </div>
          <div data-testid="edinburgh-card">
            <h2>No link here</h2>
          </div>
          <div data-testid="edinburgh-card">
            <h2><a href="https://www.bbc.com/news/articles/c2">Quake aid arrives</a></h2>
          </div>
          <div data-testid="edinburgh-card">
            <h2>   </h2><a href="/news/articles/c3">empty headline</a>
          </div>
          <div data-testid="edinburgh-card">
            <h3>Fourth story</h3><a href="/news/articles/c4">more</a>
          </div>
          <div data-testid="edinburgh-card">
            <h3>Fifth story</h3><a href="/news/articles/c5">more</a>
          </div>
          <article><h2>Generic</h2><a href="/x">x</a></article>
        </body></html>
    "#;

    #[test]
    fn test_primary_selector_extracts_and_resolves() {
        let a = adapter(spec(&["div[data-testid=\"edinburgh-card\"]", "article"], &["h2", "h3"]));
        let items = a.extract(CARDS).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title_original, "Junta extends emergency rule");
        assert_eq!(items[0].url, "https://www.bbc.com/news/articles/c1");
        assert_eq!(
            items[0].summary_original,
            "Military leaders extended the state of emergency."
        );
        assert_eq!(items[0].published_at, NaiveDate::from_ymd_opt(2025, 5, 6).unwrap());
        assert!(!items[0].published_estimated);

        assert_eq!(items[1].title_original, "Quake aid arrives");
        assert_eq!(items[1].url, "https://www.bbc.com/news/articles/c2");
        assert_eq!(items[1].summary_original, "");
        assert!(items[1].published_estimated);

        assert_eq!(items[2].title_original, "Fourth story");
        assert_eq!(items[2].url, "https://www.bbc.com/news/articles/c4");
        assert!(items.iter().all(|i| i.source_name == "BBC News"));
    }

    #[test]
    fn test_falls_back_to_secondary_selector() {
        let html = r#"<html><body>
            <article><h3><a href="/world/one">First fallback</a></h3><p>Lead</p></article>
            <article><h3><a href="two">Second fallback</a></h3></article>
        </body></html>"#;
        let a = adapter(spec(&["div[data-testid=\"edinburgh-card\"]", "article"], &["h2", "h3"]));
        let items = a.extract(html).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://www.bbc.com/world/one");
        assert_eq!(items[0].summary_original, "Lead");
        assert_eq!(items[1].url, "https://www.bbc.com/news/topics/two");
    }

    #[test]
    fn test_no_matching_selector_is_parse_failure() {
        let a = adapter(spec(&["div.sectionteaser", "article"], &["h2"]));
        let err = a.extract("<html><body><p>redesigned</p></body></html>").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_keyword_filter_and_link_as_title() {
        let html = r#"<ul>
            <li><a href="/20250506/a.htm">Thailand hosts ASEAN summit</a></li>
            <li><a href="/20250506/b.htm">Myanmar quake recovery continues</a></li>
            <li><a href="/20250506/c.htm">China-Burma rail talks</a></li>
            <li><a href="/20250506/d.htm">Myanmar opposition statement</a></li>
        </ul>"#;
        let mut s = spec(&["li"], &["a"]);
        s.url = "http://www.news.cn/english/asiapacific/index.htm".to_string();
        s.max_items = 2;
        s.keywords = vec!["Myanmar".to_string(), "burma".to_string()];
        let items = adapter(s).extract(html).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title_original, "Myanmar quake recovery continues");
        assert_eq!(items[0].url, "http://www.news.cn/20250506/b.htm");
        assert_eq!(items[1].title_original, "China-Burma rail talks");
    }

    #[test]
    fn test_non_http_links_are_skipped() {
        let html = r#"<article><h2><a href="javascript:void(0)">Bad</a></h2></article>
                      <article><h2><a href="mailto:desk@example.com">Also bad</a></h2></article>"#;
        let a = adapter(spec(&["article"], &["h2"]));
        assert!(a.extract(html).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let client = crate::sources::http_client(Duration::from_secs(1)).unwrap();
        let err = PageAdapter::new(spec(&["div[[["], &["h2"]), client).unwrap_err();
        assert!(matches!(err, SourceError::Config(_)));
    }

    #[tokio::test]
    async fn test_fetch_over_http_resolves_against_page_url() {
        let base = serve(|target| match target {
            "/tag/myanmar/" => (
                200,
                r#"<html><body>
                    <article><h3>Fighting spreads in Rakhine</h3><a href="/news/2025/5/6/rakhine">read</a></article>
                </body></html>"#
                    .to_string(),
            ),
            _ => (503, String::new()),
        })
        .await;

        let mut ok = spec(&["article"], &["h3"]);
        ok.url = format!("{base}/tag/myanmar/");
        let items = PageAdapter::new(ok, local_client()).unwrap().fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, format!("{base}/news/2025/5/6/rakhine"));

        let mut down = spec(&["article"], &["h3"]);
        down.url = format!("{base}/gone");
        let err = PageAdapter::new(down, local_client()).unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }
}
