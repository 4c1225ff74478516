//! Top-N selection balancing recency against source diversity.
//!
//! The pool is ordered newest first (stable, so same-day items keep their
//! collection order, and on the same day a reported publish date outranks a
//! collection-date estimate). A first pass admits items while their source
//! is under the per-source cap; if that leaves the quota unfilled, a second
//! pass admits the capped-out leftovers, still newest first, without a cap.
//! Second-pass items are appended after the first-pass ones.

use crate::models::NewsItem;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Result of a selection, with how many items the capped pass admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub items: Vec<NewsItem>,
    pub capped_pass: usize,
}

/// Newest first; on equal dates, reported dates before estimated ones.
fn recency(a: &NewsItem, b: &NewsItem) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then(a.published_estimated.cmp(&b.published_estimated))
}

/// Pick at most `limit` items from `pool`.
pub fn select_with_passes(mut pool: Vec<NewsItem>, limit: usize, per_source_cap: usize) -> Selection {
    pool.sort_by(recency);

    let mut slots: Vec<Option<NewsItem>> = pool.into_iter().map(Some).collect();
    let mut items = Vec::with_capacity(limit.min(slots.len()));
    let mut per_source: HashMap<String, usize> = HashMap::new();

    for slot in slots.iter_mut() {
        if items.len() >= limit {
            break;
        }
        let Some(item) = slot.as_ref() else { continue };
        let taken = per_source.entry(item.source_name.clone()).or_insert(0);
        if *taken < per_source_cap {
            *taken += 1;
            items.extend(slot.take());
        }
    }
    let capped_pass = items.len();

    for slot in slots.iter_mut() {
        if items.len() >= limit {
            break;
        }
        items.extend(slot.take());
    }

    debug!(
        capped_pass,
        uncapped_pass = items.len() - capped_pass,
        sources = per_source.len(),
        "Selection complete"
    );
    Selection { items, capped_pass }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OriginTag;
    use chrono::NaiveDate;

    fn item(title: &str, source: &str, day: u32) -> NewsItem {
        NewsItem::draft(
            title,
            "",
            &format!("https://example.com/{source}/{title}"),
            source,
            OriginTag::Unknown,
            NaiveDate::from_ymd_opt(2025, 5, day),
        )
        .unwrap()
    }

    fn select(pool: Vec<NewsItem>, limit: usize, cap: usize) -> Vec<NewsItem> {
        select_with_passes(pool, limit, cap).items
    }

    fn titles(items: &[NewsItem]) -> Vec<&str> {
        items.iter().map(|i| i.title_original.as_str()).collect()
    }

    #[test]
    fn test_sorted_newest_first_with_stable_ties() {
        let pool = vec![
            item("old", "A", 1),
            item("new-first", "B", 9),
            item("mid", "C", 5),
            item("new-second", "D", 9),
        ];
        let out = select(pool, 10, 2);
        assert_eq!(titles(&out), vec!["new-first", "new-second", "mid", "old"]);
    }

    #[test]
    fn test_reported_date_beats_estimate_on_same_day() {
        let mut estimated = item("estimated", "A", 9);
        estimated.published_estimated = true;
        let reported = item("reported", "B", 9);
        let out = select(vec![estimated, reported], 10, 2);
        assert_eq!(titles(&out), vec!["reported", "estimated"]);
    }

    #[test]
    fn test_cap_applies_in_first_pass() {
        let pool = vec![
            item("r1", "Reuters", 9),
            item("r2", "Reuters", 8),
            item("r3", "Reuters", 7),
            item("b1", "BBC", 6),
            item("b2", "BBC", 5),
            item("b3", "BBC", 4),
            item("u1", "UN", 3),
        ];
        let sel = select_with_passes(pool, 5, 2);
        assert_eq!(sel.capped_pass, 5);
        assert_eq!(titles(&sel.items), vec!["r1", "r2", "b1", "b2", "u1"]);
    }

    #[test]
    fn test_second_pass_fills_quota_after_capped_items() {
        let pool = vec![
            item("r1", "Reuters", 9),
            item("r2", "Reuters", 8),
            item("r3", "Reuters", 7),
            item("b1", "BBC", 2),
        ];
        let sel = select_with_passes(pool, 4, 2);
        assert_eq!(sel.capped_pass, 3);
        // r3 is newer than b1 but was capped out, so it lands last.
        assert_eq!(titles(&sel.items), vec!["r1", "r2", "b1", "r3"]);
    }

    #[test]
    fn test_single_source_pool_of_twelve() {
        let pool: Vec<NewsItem> = (1..=12)
            .map(|d| item(&format!("s{d}"), "Single", d))
            .collect();
        let sel = select_with_passes(pool, 10, 2);
        assert_eq!(sel.capped_pass, 2);
        assert_eq!(titles(&sel.items[..2]), vec!["s12", "s11"]);
        assert_eq!(sel.items.len(), 10);
        assert_eq!(sel.items[9].title_original, "s3");
    }

    #[test]
    fn test_never_exceeds_limit_and_short_pool_returns_all() {
        let pool: Vec<NewsItem> = (1..=6)
            .map(|d| item(&format!("t{d}"), if d % 2 == 0 { "A" } else { "B" }, d))
            .collect();
        assert_eq!(select(pool.clone(), 3, 2).len(), 3);
        assert_eq!(select(pool.clone(), 10, 2).len(), 6);
        assert!(select(pool, 0, 2).is_empty());
        assert!(select(Vec::new(), 10, 2).is_empty());
    }

    #[test]
    fn test_zero_cap_degrades_to_uncapped_recency() {
        let pool = vec![item("a", "A", 1), item("b", "B", 2)];
        let sel = select_with_passes(pool, 10, 0);
        assert_eq!(sel.capped_pass, 0);
        assert_eq!(titles(&sel.items), vec!["b", "a"]);
    }
}
