//! Source adapters that turn one origin into draft [`NewsItem`]s.
//!
//! Every origin is reached through the same [`SourceAdapter`] capability:
//! "produce zero or more drafts, best effort". The per-origin differences
//! live in configuration ([`SourceSpec`]), not in code.
//!
//! # Adapters
//!
//! | Variant | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Structured | [`newsapi`] | JSON search API | Several query variants per run; needs an API key |
//! | Scraped | [`page`] | HTML scraping | Ordered selector fallbacks, bounded item count |
//!
//! # Failure Surface
//!
//! A malformed item is skipped inside the adapter. A failed source returns
//! a [`SourceError`]; the pipeline records it and carries on.

use crate::config::SourceSpec;
use crate::error::SourceError;
use crate::models::NewsItem;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

pub mod newsapi;
pub mod page;

use newsapi::NewsApiAdapter;
use page::PageAdapter;

/// Browser-like agent; several origins refuse the default reqwest agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One origin of news items.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Human-readable name used in logs and the run summary.
    fn name(&self) -> &str;

    /// Fetch and normalize drafts from the origin.
    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError>;
}

/// Build the shared HTTP client with the per-request fetch timeout.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Build one adapter per source spec.
///
/// A spec that can never work (for instance an unparsable base URL) still
/// yields an adapter, one that fails on `fetch`, so the problem shows up in
/// the run summary next to the other sources.
pub fn build_adapters(
    specs: &[SourceSpec],
    client: &Client,
    newsapi_key: Option<&str>,
) -> Vec<Box<dyn SourceAdapter>> {
    specs
        .iter()
        .map(|spec| -> Box<dyn SourceAdapter> {
            match spec {
                SourceSpec::Api(api) => Box::new(NewsApiAdapter::new(
                    api.clone(),
                    newsapi_key.map(str::to_string),
                    client.clone(),
                )),
                SourceSpec::Page(p) => match PageAdapter::new(p.clone(), client.clone()) {
                    Ok(adapter) => Box::new(adapter),
                    Err(e) => Box::new(Broken {
                        name: p.name.clone(),
                        reason: e.to_string(),
                    }),
                },
            }
        })
        .collect()
}

/// Stand-in for a source whose configuration was rejected up front.
struct Broken {
    name: String,
    reason: String,
}

#[async_trait]
impl SourceAdapter for Broken {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>, SourceError> {
        Err(SourceError::Config(self.reason.clone()))
    }
}

/// GET `url` and return the body, treating any non-2xx status as a failure.
#[instrument(level = "debug", skip(client))]
pub(crate) async fn fetch_text(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.text().await?;
    debug!(bytes = body.len(), "Fetched page");
    Ok(body)
}

/// Parse an origin-reported date: RFC 3339 first, then a leading
/// `YYYY-MM-DD`.
pub(crate) fn parse_published_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}
