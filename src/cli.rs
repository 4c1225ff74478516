//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can be provided via a command-line flag or an environment
//! variable, and all of them have a default that works for a local run.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news collector.
///
/// # Examples
///
/// ```sh
/// # Collect with the built-in Myanmar sources, translating to Japanese
/// NEWSAPI_KEY=... topic_news
///
/// # Custom source list, English output, cache kept between runs
/// topic_news --sources sources.yaml --target-lang en --translation-cache cache.json
///
/// # Print stats for the current snapshot without collecting
/// topic_news --stats
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the snapshot JSON file
    #[arg(short, long, env = "NEWS_OUTPUT_PATH", default_value = "news_snapshot.json")]
    pub output: PathBuf,

    /// Language code to translate titles and summaries into
    #[arg(short, long, env = "TRANSLATE_TARGET", default_value = "ja")]
    pub target_lang: String,

    /// NewsAPI key; without it the structured source is skipped
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// YAML file replacing the built-in source list
    #[arg(short, long, env = "NEWS_SOURCES")]
    pub sources: Option<PathBuf>,

    /// JSON file persisting the translation cache between runs
    #[arg(long, env = "TRANSLATION_CACHE")]
    pub translation_cache: Option<PathBuf>,

    /// Maximum number of items in the snapshot
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Items per source admitted before the quota is filled uncapped
    #[arg(long, default_value_t = 2)]
    pub per_source_cap: usize,

    /// Title similarity above which two stories are duplicates
    #[arg(long, default_value_t = 0.85)]
    pub dup_threshold: f64,

    /// Sources fetched concurrently
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Upper bound on the whole run, in seconds
    #[arg(long, default_value_t = 180)]
    pub deadline_secs: u64,

    /// Timeout for a single HTTP request, in seconds
    #[arg(long, default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// Print stats for the stored snapshot instead of collecting
    #[arg(long)]
    pub stats: bool,
}
