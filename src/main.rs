//! # Topic News
//!
//! A news collector that gathers recent headlines about Myanmar from a
//! structured news-search API and a handful of HTML listing pages, drops
//! near-duplicate stories, translates titles and summaries into a target
//! language, and publishes a bounded, source-diverse snapshot as JSON.
//!
//! ## Features
//!
//! - Source adapters for a NewsAPI-compatible search endpoint and for
//!   selector-driven HTML listing pages, configurable from YAML
//! - Cross-source near-duplicate detection on original-language titles
//! - Translation with retry, chunking and a cache that can persist between runs
//! - Top-N selection by recency with a per-source cap and an uncapped fill pass
//! - Atomic snapshot replacement, so readers never see a partial file
//!
//! ## Usage
//!
//! ```sh
//! NEWSAPI_KEY=... topic_news -o ./public/news_snapshot.json
//! topic_news --stats -o ./public/news_snapshot.json
//! ```
//!
//! ## Architecture
//!
//! Each run follows a pipeline:
//! 1. **Collecting**: Fetch all sources concurrently under a run deadline
//! 2. **Deduplicating**: Keep the first copy of each story, in source order
//! 3. **Translating**: Translate titles and summaries of the surviving items
//! 4. **Selecting**: Pick the newest items, at most a few per source
//! 5. **Persisting**: Replace the snapshot file atomically

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dedup;
mod error;
mod models;
mod pipeline;
mod select;
mod sources;
mod store;
mod translate;
mod utils;

use cli::Cli;
use config::{SelectionConfig, TranslatorConfig, default_sources, load_sources};
use pipeline::{Pipeline, PipelineConfig};
use store::{SnapshotStats, SnapshotStore};
use translate::{GoogleTranslateBackend, Translator, load_cache, save_cache};
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("topic_news starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.output, ?args.sources, target_lang = %args.target_lang, "Parsed CLI arguments");

    let store = SnapshotStore::new(&args.output);

    if args.stats {
        let snapshot = store.load().await?;
        if snapshot.is_empty() {
            warn!(path = %args.output.display(), "Snapshot has no items");
        }
        let stats = SnapshotStats::from_snapshot(&snapshot);
        info!(total = stats.total, sources = stats.by_source.len(), "Loaded snapshot stats");
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    // Early check: ensure the snapshot location is writable
    if let Err(e) = ensure_writable_parent(&args.output).await {
        error!(
            path = %args.output.display(),
            error = %e,
            "Snapshot directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Sources ----
    let specs = match &args.sources {
        Some(path) => load_sources(path).await?,
        None => default_sources(),
    };
    if args.newsapi_key.is_none() {
        warn!("NEWSAPI_KEY not set; the API source will be reported as failed");
    }
    let client = sources::http_client(Duration::from_secs(args.fetch_timeout_secs))?;
    let adapters = sources::build_adapters(&specs, &client, args.newsapi_key.as_deref());
    info!(count = adapters.len(), "Configured sources");

    // ---- Translator ----
    let translator_config = TranslatorConfig {
        target_lang: args.target_lang.clone(),
        ..TranslatorConfig::default()
    };
    let mut translator = Translator::new(GoogleTranslateBackend::new(client.clone()), translator_config);
    if let Some(path) = &args.translation_cache {
        translator = translator.with_cache(load_cache(path).await);
    }

    // ---- Run ----
    let config = PipelineConfig {
        selection: SelectionConfig {
            limit: args.limit,
            per_source_cap: args.per_source_cap,
            dup_threshold: args.dup_threshold,
        },
        concurrency: args.concurrency.max(1),
        deadline: Duration::from_secs(args.deadline_secs),
    };
    let mut pipeline = Pipeline::new(adapters, translator, store, config);

    let outcome = match pipeline.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(path = %args.output.display(), error = %e, "Failed to write snapshot; previous snapshot kept");
            return Err(e.into());
        }
    };

    // Cache persistence is best effort; the snapshot is already written.
    if let Some(path) = &args.translation_cache {
        if let Err(e) = save_cache(path, pipeline.translator().cache()).await {
            warn!(path = %path.display(), error = %e, "Failed to save translation cache");
        }
    }

    let summary = &outcome.summary;
    for report in summary.sources.iter().filter(|r| r.failed()) {
        warn!(
            source = %report.source_name,
            error = report.error.as_deref().unwrap_or_default(),
            "Source contributed nothing this run"
        );
    }

    info!(
        items = outcome.snapshot.item_count,
        failed_sources = summary.failed_sources,
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        path = %args.output.display(),
        "Snapshot published"
    );

    Ok(())
}
