//! The collection run: fetch → deduplicate → translate → select → persist.
//!
//! # Ordering
//!
//! Sources are fetched concurrently (bounded by `concurrency`), but every
//! result lands in the slot of the source that produced it and the
//! accumulator is only touched after collection ends, walking the slots in
//! configuration order. Completion order therefore never affects the output.
//!
//! # Deadline
//!
//! The run deadline cuts collection short: whatever sources have answered by
//! then are used, the rest are reported as timed out. Translation also stops
//! once the deadline has passed, leaving the remaining items untranslated.
//! Only a failed snapshot write fails the run.

use crate::config::SelectionConfig;
use crate::dedup::Deduplicator;
use crate::error::{SourceError, StoreError};
use crate::models::{NewsItem, RunSummary, Snapshot, SourceReport};
use crate::select::select_with_passes;
use crate::sources::SourceAdapter;
use crate::store::SnapshotStore;
use crate::translate::{TranslateBackend, Translator};
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub selection: SelectionConfig,
    /// Sources fetched at the same time.
    pub concurrency: usize,
    /// Upper bound on the whole run.
    pub deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            concurrency: 4,
            deadline: Duration::from_secs(180),
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: Snapshot,
    pub summary: RunSummary,
}

type SourceResult = Result<Vec<NewsItem>, SourceError>;

/// Stand-in deadline for run budgets too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct Pipeline<B> {
    adapters: Vec<Box<dyn SourceAdapter>>,
    translator: Translator<B>,
    dedup: Deduplicator,
    store: SnapshotStore,
    config: PipelineConfig,
}

impl<B> Pipeline<B>
where
    B: TranslateBackend,
{
    pub fn new(
        adapters: Vec<Box<dyn SourceAdapter>>,
        translator: Translator<B>,
        store: SnapshotStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            adapters,
            translator,
            dedup: Deduplicator::new(config.selection.dup_threshold),
            store,
            config,
        }
    }

    pub fn translator(&self) -> &Translator<B> {
        &self.translator
    }

    /// Execute one run and persist its snapshot.
    #[instrument(level = "info", skip_all, fields(sources = self.adapters.len()))]
    pub async fn run(&mut self) -> Result<RunOutcome, StoreError> {
        let t0 = Instant::now();
        let deadline = t0
            .checked_add(self.config.deadline)
            .unwrap_or_else(|| t0 + FAR_FUTURE);

        let (results, deadline_expired) = self.collect(deadline).await;

        let mut accepted: Vec<NewsItem> = Vec::new();
        let mut reports = Vec::with_capacity(self.adapters.len());
        for (adapter, result) in self.adapters.iter().zip(results) {
            let name = adapter.name().to_string();
            let report = match result {
                Some(Ok(drafts)) => {
                    let fetched = drafts.len();
                    let taken = self.dedup.accept_into(&mut accepted, drafts);
                    info!(source = %name, fetched, accepted = taken, "Source collected");
                    SourceReport {
                        source_name: name,
                        fetched,
                        accepted: taken,
                        error: None,
                    }
                }
                Some(Err(e)) => {
                    warn!(source = %name, error = %e, "Source failed; contributing nothing");
                    SourceReport {
                        source_name: name,
                        fetched: 0,
                        accepted: 0,
                        error: Some(e.to_string()),
                    }
                }
                None => {
                    warn!(source = %name, "Source did not answer before the run deadline");
                    SourceReport {
                        source_name: name,
                        fetched: 0,
                        accepted: 0,
                        error: Some("timed out at run deadline".to_string()),
                    }
                }
            };
            reports.push(report);
        }
        info!(accepted = accepted.len(), "Deduplication complete");

        let translation_cut = self.translate_all(&mut accepted, deadline).await;
        let deadline_expired = deadline_expired || translation_cut;

        let selection = select_with_passes(
            accepted,
            self.config.selection.limit,
            self.config.selection.per_source_cap,
        );
        info!(
            selected = selection.items.len(),
            capped_pass = selection.capped_pass,
            limit = self.config.selection.limit,
            per_source_cap = self.config.selection.per_source_cap,
            "Selection complete"
        );
        for (rank, item) in selection.items.iter().enumerate() {
            info!(
                rank = rank + 1,
                source = %item.source_name,
                date = %item.published_at,
                title = %truncate_for_log(item.display_title(), 60),
                "Selected"
            );
        }

        let snapshot = Snapshot::new(selection.items);
        if let Err(e) = self.store.save(&snapshot).await {
            error!(path = %self.store.path().display(), error = %e, "Failed to write snapshot");
            return Err(e);
        }

        let summary = RunSummary {
            total_fetched: reports.iter().map(|r| r.fetched).sum(),
            total_accepted: reports.iter().map(|r| r.accepted).sum(),
            total_selected: snapshot.item_count,
            failed_sources: reports.iter().filter(|r| r.failed()).count(),
            deadline_expired,
            sources: reports,
        };
        let stats = self.translator.stats();
        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            fetched = summary.total_fetched,
            accepted = summary.total_accepted,
            selected = summary.total_selected,
            failed_sources = summary.failed_sources,
            deadline_expired,
            translate_calls = stats.external_calls,
            translate_cache_hits = stats.cache_hits,
            translate_fallbacks = stats.fallbacks,
            "Run complete"
        );

        Ok(RunOutcome { snapshot, summary })
    }

    /// Fetch every source, at most `concurrency` at a time, until all have
    /// answered or `deadline` passes. Slot `i` holds source `i`'s result;
    /// `None` means it never answered.
    async fn collect(&self, deadline: Instant) -> (Vec<Option<SourceResult>>, bool) {
        let mut results: Vec<Option<SourceResult>> = self.adapters.iter().map(|_| None).collect();
        let mut pending = stream::iter(self.adapters.iter().enumerate())
            .map(|(i, adapter)| async move { (i, adapter.fetch().await) })
            .buffer_unordered(self.config.concurrency.max(1));

        let mut expired = false;
        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((i, result))) => results[i] = Some(result),
                Ok(None) => break,
                Err(_) => {
                    let missing = results.iter().filter(|r| r.is_none()).count();
                    warn!(missing, "Run deadline reached; continuing with collected drafts");
                    expired = true;
                    break;
                }
            }
        }
        (results, expired)
    }

    /// Fill in translated titles and summaries. An item whose translation
    /// is still running at the deadline is left untranslated, as are all
    /// items after it. Returns `true` if the deadline cut translation short.
    async fn translate_all(&mut self, items: &mut [NewsItem], deadline: Instant) -> bool {
        let total = items.len();
        for (i, item) in items.iter_mut().enumerate() {
            let translated = if Instant::now() >= deadline {
                None
            } else {
                let translator = &mut self.translator;
                let (title, summary) = (&item.title_original, &item.summary_original);
                timeout_at(deadline, async move {
                    let title = translator.translate(title).await;
                    (title, translator.translate_opt(summary).await)
                })
                .await
                .ok()
            };
            let Some((title, summary)) = translated else {
                warn!(
                    untranslated = total - i,
                    "Run deadline reached; leaving remaining items untranslated"
                );
                return true;
            };
            item.title_translated = Some(title);
            item.summary_translated = summary;
        }
        false
    }
}
