//! Near-duplicate detection across sources.
//!
//! Two stories are near-duplicates when their original-language titles
//! have a matching-blocks similarity above the configured threshold. The
//! comparison never looks at translated text, so translation variance can't
//! split or merge stories.
//!
//! Similarity is the Ratcliff/Obershelp ratio: find the longest common
//! contiguous block, recurse on the pieces to its left and right, and
//! report `2 * matched / (len(a) + len(b))`. Comparison is case-insensitive
//! and counts characters, not bytes.

use crate::models::NewsItem;
use std::collections::HashMap;
use tracing::debug;

/// Case-insensitive matching-blocks similarity in `[0.0, 1.0]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a`
/// and then earliest in `b` on ties. Returns `(i, j, len)`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // Length of the match ending at b[j] for the previous row of a.
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(js) = b2j.get(c) {
            for &j in js {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 } + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }
    (best_i, best_j, best_k)
}

/// Decides whether an incoming draft repeats a story already accepted.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// `true` if `candidate`'s title is more similar than the threshold to
    /// the title of any accepted item.
    pub fn is_duplicate(&self, candidate: &NewsItem, accepted: &[NewsItem]) -> bool {
        accepted.iter().any(|existing| {
            let score = similarity(&candidate.title_original, &existing.title_original);
            if score > self.threshold {
                debug!(
                    candidate = %candidate.title_original,
                    existing = %existing.title_original,
                    existing_source = %existing.source_name,
                    score,
                    "Near-duplicate dropped"
                );
                true
            } else {
                false
            }
        })
    }

    /// Append every draft that is not a near-duplicate of something already
    /// in `accepted` (including drafts accepted earlier in this call).
    /// First seen wins. Returns how many drafts were accepted.
    pub fn accept_into(&self, accepted: &mut Vec<NewsItem>, drafts: Vec<NewsItem>) -> usize {
        let mut count = 0;
        for draft in drafts {
            if !self.is_duplicate(&draft, accepted) {
                accepted.push(draft);
                count += 1;
            }
        }
        count
    }
}
