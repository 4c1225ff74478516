//! Data models for collected news items and the persisted snapshot.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`NewsItem`]: One normalized story, from draft through translation
//! - [`OriginTag`]: Coarse geographic/category grouping of a story
//! - [`Snapshot`]: The single artifact written at the end of a run
//! - [`SourceReport`] / [`RunSummary`]: Per-run observability counters

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Titles some origins return in place of a story that has been taken down.
pub const SENTINEL_TITLES: &[&str] = &["[Removed]", "[Deleted]"];

/// Coarse grouping used for diversity and display filtering.
///
/// Unrecognized tags in a loaded snapshot or source file deserialize as
/// [`OriginTag::Unknown`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginTag {
    International,
    Myanmar,
    Thailand,
    UnitedStates,
    UnitedKingdom,
    Japan,
    Korea,
    China,
    India,
    Singapore,
    #[default]
    #[serde(other)]
    Unknown,
}

impl OriginTag {
    /// Short human label used in logs and stats output.
    pub fn label(&self) -> &'static str {
        match self {
            OriginTag::International => "international",
            OriginTag::Myanmar => "myanmar",
            OriginTag::Thailand => "thailand",
            OriginTag::UnitedStates => "united_states",
            OriginTag::UnitedKingdom => "united_kingdom",
            OriginTag::Japan => "japan",
            OriginTag::Korea => "korea",
            OriginTag::China => "china",
            OriginTag::India => "india",
            OriginTag::Singapore => "singapore",
            OriginTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single news story.
///
/// Adapters produce drafts with only the `*_original` fields set; the
/// pipeline fills in the translations once the item survives deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Headline as published by the origin.
    pub title_original: String,
    /// Headline in the target language, absent until translated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_translated: Option<String>,
    /// Summary paragraph as published, empty when the origin has none.
    #[serde(default)]
    pub summary_original: String,
    /// Summary in the target language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_translated: Option<String>,
    /// Canonical absolute URL of the story.
    pub url: String,
    /// Human-readable outlet name, e.g. "Reuters".
    pub source_name: String,
    #[serde(default)]
    pub origin_tag: OriginTag,
    /// Origin-reported publish date, or the collection date.
    pub published_at: NaiveDate,
    /// `true` when `published_at` is the collection date rather than a
    /// date reported by the origin.
    #[serde(default)]
    pub published_estimated: bool,
}

impl NewsItem {
    /// Build a draft, enforcing the record invariants.
    ///
    /// Returns `None` when the title is empty or a sentinel, or when `url`
    /// is empty. The caller is responsible for resolving `url` to an
    /// absolute form first.
    pub fn draft(
        title: &str,
        summary: &str,
        url: &str,
        source_name: &str,
        origin_tag: OriginTag,
        published_at: Option<NaiveDate>,
    ) -> Option<NewsItem> {
        let title = title.trim();
        if !is_usable_title(title) || url.trim().is_empty() {
            return None;
        }
        let (published_at, published_estimated) = match published_at {
            Some(date) => (date, false),
            None => (Utc::now().date_naive(), true),
        };
        Some(NewsItem {
            title_original: title.to_string(),
            title_translated: None,
            summary_original: summary.trim().to_string(),
            summary_translated: None,
            url: url.trim().to_string(),
            source_name: source_name.to_string(),
            origin_tag,
            published_at,
            published_estimated,
        })
    }

    /// Title to show a reader: the translation when present.
    pub fn display_title(&self) -> &str {
        self.title_translated
            .as_deref()
            .unwrap_or(&self.title_original)
    }
}

/// Returns `true` if `title` is non-empty and not a known removal marker.
pub fn is_usable_title(title: &str) -> bool {
    let title = title.trim();
    !title.is_empty() && !SENTINEL_TITLES.iter().any(|s| title.eq_ignore_ascii_case(s))
}

/// The persisted output of one pipeline run.
///
/// Items are in final rank order, most important/recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub item_count: usize,
    pub items: Vec<NewsItem>,
}

impl Snapshot {
    pub fn new(items: Vec<NewsItem>) -> Snapshot {
        Snapshot {
            generated_at: Utc::now(),
            item_count: items.len(),
            items,
        }
    }

    /// The "no data yet" snapshot handed to readers when nothing is stored.
    pub fn empty() -> Snapshot {
        Snapshot::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of a single source within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source_name: String,
    /// Drafts the adapter returned.
    pub fetched: usize,
    /// Drafts that survived deduplication.
    pub accepted: usize,
    /// Set when the adapter failed or was cut off by the run deadline.
    pub error: Option<String>,
}

impl SourceReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary of a finished run, reported to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
    pub total_fetched: usize,
    pub total_accepted: usize,
    pub total_selected: usize,
    pub failed_sources: usize,
    pub deadline_expired: bool,
}
