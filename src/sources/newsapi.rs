//! Structured adapter for a NewsAPI-compatible search endpoint.
//!
//! One run issues every configured [`QueryVariant`] in turn (per language,
//! per topic filter, per outlet whitelist), sleeping between calls to stay
//! under the endpoint's rate limit. A variant that fails is logged and
//! skipped; the source only fails when no variant succeeded.

use super::{SourceAdapter, parse_published_date};
use crate::config::{ApiSourceSpec, QueryVariant};
use crate::error::SourceError;
use crate::models::NewsItem;
use crate::utils::{clean_text, truncate_chars};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Response envelope of the `/v2/everything` endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
pub struct ApiArticle {
    #[serde(default)]
    pub source: Option<ApiOutlet>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiOutlet {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct NewsApiAdapter {
    spec: ApiSourceSpec,
    api_key: Option<String>,
    client: Client,
}

impl NewsApiAdapter {
    pub fn new(spec: ApiSourceSpec, api_key: Option<String>, client: Client) -> Self {
        Self {
            spec,
            api_key,
            client,
        }
    }

    #[instrument(level = "info", skip_all, fields(q = %variant.q, language = %variant.language))]
    async fn run_query(
        &self,
        api_key: &str,
        variant: &QueryVariant,
    ) -> Result<Vec<NewsItem>, SourceError> {
        let from = lookback_start(self.spec.lookback_days)?;
        let page_size = self.spec.page_size.to_string();
        let mut params = vec![
            ("apiKey", api_key),
            ("q", variant.q.as_str()),
            ("language", variant.language.as_str()),
            ("sortBy", "publishedAt"),
            ("pageSize", page_size.as_str()),
            ("from", from.as_str()),
        ];
        if let Some(ref sources) = variant.sources {
            params.push(("sources", sources.as_str()));
        }

        let response = self
            .client
            .get(&self.spec.endpoint)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: self.spec.endpoint.clone(),
            });
        }
        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("search response: {e}")))?;
        if parsed.status != "ok" {
            return Err(SourceError::Parse(format!(
                "search status {:?}: {}",
                parsed.status,
                parsed.message.unwrap_or_default()
            )));
        }

        let drafts = map_articles(parsed.articles, variant, self.spec.summary_chars);
        debug!(count = drafts.len(), "Mapped query results");
        Ok(drafts)
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    fn name(&self) -> &str {
        &self.spec.name
    }

    #[instrument(level = "info", skip_all, fields(source = %self.spec.name))]
    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SourceError::Config("no API key configured".to_string()));
        };

        let mut drafts = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for (i, variant) in self.spec.queries.iter().enumerate() {
            if i > 0 {
                sleep(StdDuration::from_millis(self.spec.query_delay_ms)).await;
            }
            match self.run_query(api_key, variant).await {
                Ok(mut items) => {
                    succeeded += 1;
                    drafts.append(&mut items);
                }
                Err(e) => {
                    warn!(q = %variant.q, origin = %variant.origin_tag, error = %e, "Query variant failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => {
                info!(count = drafts.len(), variants = succeeded, "Collected structured results");
                Ok(drafts)
            }
        }
    }
}

/// `YYYY-MM-DD` of the day `lookback_days` before today.
fn lookback_start(lookback_days: i64) -> Result<String, SourceError> {
    TimeDelta::try_days(lookback_days)
        .and_then(|back| Utc::now().checked_sub_signed(back))
        .map(|from| from.format("%Y-%m-%d").to_string())
        .ok_or_else(|| SourceError::Config(format!("lookback_days {lookback_days} is out of range")))
}

/// Map search results to drafts, dropping records that break the item
/// invariants (empty or removed title, missing or relative URL).
pub fn map_articles(
    articles: Vec<ApiArticle>,
    variant: &QueryVariant,
    summary_chars: usize,
) -> Vec<NewsItem> {
    articles
        .into_iter()
        .filter_map(|a| {
            let title = clean_text(a.title.as_deref().unwrap_or_default());
            let url = a
                .url
                .as_deref()
                .and_then(|u| Url::parse(u.trim()).ok())
                .filter(|u| matches!(u.scheme(), "http" | "https"))
                .map(|u| u.to_string());
            let Some(url) = url else {
                debug!(%title, "Dropping result without absolute URL");
                return None;
            };

            let summary_raw = a
                .description
                .filter(|d| !d.trim().is_empty())
                .or(a.content)
                .unwrap_or_default();
            let summary = clean_text(&summary_raw);
            let summary = truncate_chars(&summary, summary_chars);

            let outlet = a
                .source
                .and_then(|s| s.name)
                .map(|n| clean_text(&n))
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "NewsAPI".to_string());
            let published = a.published_at.as_deref().and_then(parse_published_date);

            let item = NewsItem::draft(&title, summary, &url, &outlet, variant.origin_tag, published);
            if item.is_none() {
                debug!(%title, "Dropping result with unusable title");
            }
            item
        })
        .collect()
}
