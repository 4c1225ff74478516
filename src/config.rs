//! Pipeline tunables and the source list.
//!
//! Sources are data: each one is a [`SourceSpec`] describing where to fetch
//! and how to extract, and a single generic adapter per variant turns that
//! description into drafts. The built-in list targets Myanmar coverage; a
//! YAML file with the same shape replaces it wholesale.
//!
//! ```yaml
//! - kind: page
//!   name: BBC News
//!   url: https://www.bbc.com/news/topics/c8nq32jw5r7t
//!   origin_tag: international
//!   candidate_selectors: ['div[data-testid="edinburgh-card"]', article]
//!   title_selectors: [h2, h3]
//! ```

use crate::models::OriginTag;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Knobs for deduplication and top-N selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Maximum number of items in the snapshot.
    pub limit: usize,
    /// Items admitted per source before the uncapped second pass.
    pub per_source_cap: usize,
    /// Title similarity above which a candidate is a near-duplicate.
    pub dup_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            per_source_cap: 2,
            dup_threshold: 0.85,
        }
    }
}

/// Knobs for the translator and its retry/pacing behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorConfig {
    /// Target language code passed to the translation service.
    pub target_lang: String,
    /// Inputs longer than this many characters are split into chunks.
    pub chunk_chars: usize,
    /// Retries after the first failed attempt.
    pub max_retries: usize,
    /// Fixed wait between attempts.
    pub retry_delay: Duration,
    /// Fixed wait after every external call.
    pub pace_delay: Duration,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            target_lang: "ja".to_string(),
            chunk_chars: 5000,
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            pace_delay: Duration::from_millis(500),
        }
    }
}

/// One origin to collect from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// A NewsAPI-compatible JSON search endpoint.
    Api(ApiSourceSpec),
    /// A single HTML listing page.
    Page(PageSourceSpec),
}

impl SourceSpec {
    pub fn name(&self) -> &str {
        match self {
            SourceSpec::Api(s) => &s.name,
            SourceSpec::Page(s) => &s.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSourceSpec {
    pub name: String,
    pub endpoint: String,
    pub queries: Vec<QueryVariant>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Only ask for stories published within this many days.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Minimum delay between two queries against this endpoint.
    #[serde(default = "default_query_delay_ms")]
    pub query_delay_ms: u64,
    /// Summaries are cut to this many characters.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

/// One parameterization of a structured query, widening coverage by
/// language, topic filter or outlet whitelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub q: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub origin_tag: OriginTag,
    /// Comma-separated outlet ids to restrict the query to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSourceSpec {
    pub name: String,
    pub url: String,
    /// Base for resolving relative links; defaults to `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub origin_tag: OriginTag,
    /// Selectors tried in order; the first that matches anything wins.
    pub candidate_selectors: Vec<String>,
    /// Selectors tried in order inside a candidate to find the headline.
    #[serde(default = "default_title_selectors")]
    pub title_selectors: Vec<String>,
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
    #[serde(default = "default_summary_selector")]
    pub summary_selector: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// When non-empty, only headlines containing one of these are kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

fn default_page_size() -> usize {
    5
}
fn default_lookback_days() -> i64 {
    3
}
fn default_query_delay_ms() -> u64 {
    500
}
fn default_summary_chars() -> usize {
    500
}
fn default_language() -> String {
    "en".to_string()
}
fn default_title_selectors() -> Vec<String> {
    vec!["h2".to_string(), "h3".to_string()]
}
fn default_link_selector() -> String {
    "a[href]".to_string()
}
fn default_summary_selector() -> String {
    "p".to_string()
}
fn default_max_items() -> usize {
    5
}

/// Load a source list from a YAML file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sources(path: &Path) -> Result<Vec<SourceSpec>, Box<dyn Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let sources: Vec<SourceSpec> = serde_yaml::from_str(&raw)?;
    info!(count = sources.len(), "Loaded source list");
    Ok(sources)
}

fn query(q: &str, language: &str, origin_tag: OriginTag, sources: Option<&str>) -> QueryVariant {
    QueryVariant {
        q: q.to_string(),
        language: language.to_string(),
        origin_tag,
        sources: sources.map(str::to_string),
    }
}

fn page(
    name: &str,
    url: &str,
    origin_tag: OriginTag,
    candidate_selectors: &[&str],
    title_selectors: &[&str],
) -> PageSourceSpec {
    PageSourceSpec {
        name: name.to_string(),
        url: url.to_string(),
        base_url: None,
        origin_tag,
        candidate_selectors: candidate_selectors.iter().map(|s| s.to_string()).collect(),
        title_selectors: title_selectors.iter().map(|s| s.to_string()).collect(),
        link_selector: default_link_selector(),
        summary_selector: default_summary_selector(),
        max_items: default_max_items(),
        keywords: Vec::new(),
    }
}

/// The built-in Myanmar source list.
pub fn default_sources() -> Vec<SourceSpec> {
    let newsapi = ApiSourceSpec {
        name: "NewsAPI".to_string(),
        endpoint: "https://newsapi.org/v2/everything".to_string(),
        queries: vec![
            query("Myanmar OR Burma", "en", OriginTag::International, None),
            query("Myanmar AND (military OR coup OR crisis)", "en", OriginTag::Myanmar, None),
            query("Myanmar AND Thailand", "en", OriginTag::Thailand, None),
            query(
                "Myanmar",
                "en",
                OriginTag::UnitedStates,
                Some("the-washington-post,reuters,bbc-news,cnn"),
            ),
            query("ミャンマー", "ja", OriginTag::Japan, None),
            query("미얀마", "ko", OriginTag::Korea, None),
            query("缅甸", "zh", OriginTag::China, None),
        ],
        page_size: default_page_size(),
        lookback_days: default_lookback_days(),
        query_delay_ms: default_query_delay_ms(),
        summary_chars: default_summary_chars(),
    };

    let mut un_news = page(
        "UN News",
        "https://news.un.org/en/tags/myanmar",
        OriginTag::International,
        &["div.story-content", "article"],
        &["h3", "h2"],
    );
    un_news.max_items = 3;

    let mut al_jazeera = page(
        "Al Jazeera",
        "https://www.aljazeera.com/tag/myanmar/",
        OriginTag::International,
        &["article"],
        &["h3"],
    );
    al_jazeera.max_items = 3;

    let mut xinhua = page(
        "Xinhua",
        "http://www.news.cn/english/asiapacific/index.htm",
        OriginTag::China,
        &["li"],
        &["a"],
    );
    xinhua.max_items = 2;
    xinhua.keywords = vec!["myanmar".to_string(), "burma".to_string()];

    vec![
        SourceSpec::Api(newsapi),
        SourceSpec::Page(page(
            "BBC News",
            "https://www.bbc.com/news/topics/c8nq32jw5r7t",
            OriginTag::International,
            &["div[data-testid=\"edinburgh-card\"]", "article"],
            &["h2", "h3"],
        )),
        SourceSpec::Page(page(
            "Reuters",
            "https://www.reuters.com/world/asia-pacific/myanmar/",
            OriginTag::International,
            &["li[data-testid=\"MediaStoryCard\"]", "li[data-testid=\"Body\"]", "article"],
            &["h3", "h2"],
        )),
        SourceSpec::Page(page(
            "Radio Free Asia",
            "https://www.rfa.org/english/news/myanmar",
            OriginTag::UnitedStates,
            &["div.sectionteaser", "article"],
            &["h2", "h3", "a"],
        )),
        SourceSpec::Page(page(
            "The Irrawaddy",
            "https://www.irrawaddy.com/",
            OriginTag::Myanmar,
            &["article", "div.article-content"],
            &["h2", "h3"],
        )),
        SourceSpec::Page(al_jazeera),
        SourceSpec::Page(un_news),
        SourceSpec::Page(xinhua),
    ]
}
