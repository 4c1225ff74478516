//! Machine translation with retry, chunking and an exact-text cache.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the external service can be
//! swapped out (and faked in tests):
//! - [`TranslateBackend`]: Core trait, one call to the external service
//! - [`GoogleTranslateBackend`]: The public Google Translate endpoint
//! - [`RetryTranslate`]: Decorator that retries any backend with a fixed delay
//! - [`Translator`]: What the pipeline holds; chunks long input, paces calls,
//!   caches successes and degrades to the source text on failure
//!
//! # Cache
//!
//! Keys are the exact source text, so a hit is always correct for that
//! text but near-identical strings never share an entry. The cache lives as
//! long as the [`Translator`] and can be loaded from / saved to a JSON file
//! to carry it across runs.

use crate::config::TranslatorConfig;
use crate::error::{StoreError, TranslationError};
use crate::store::write_atomic;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// One request to an external translation service.
pub trait TranslateBackend {
    /// Translate `text` into `target_lang`.
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError>;
}

/// Wrapper that retries any [`TranslateBackend`] a fixed number of times,
/// waiting a fixed delay between attempts.
pub struct RetryTranslate<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    delay: Duration,
}

impl<T> RetryTranslate<T>
where
    T: TranslateBackend,
{
    pub fn new(inner: T, max_retries: usize, delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            delay,
        }
    }
}

impl<T> fmt::Debug for RetryTranslate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTranslate")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> TranslateBackend for RetryTranslate<T>
where
    T: TranslateBackend,
{
    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.translate(text, target_lang).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "translate() exhausted retries"
                        );
                        return Err(e);
                    }
                    warn!(
                        attempt,
                        max = self.max_retries,
                        delay = ?self.delay,
                        error = %e,
                        "translate() attempt failed; retrying"
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

/// Client for the keyless `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslateBackend {
    client: Client,
    endpoint: String,
}

impl GoogleTranslateBackend {
    pub const DEFAULT_ENDPOINT: &'static str = "https://translate.googleapis.com/translate_a/single";

    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl TranslateBackend for GoogleTranslateBackend {
    #[instrument(level = "debug", skip_all, fields(%target_lang))]
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        let url = format!(
            "{}?client=gtx&sl=auto&tl={}&dt=t&q={}",
            self.endpoint,
            urlencoding::encode(target_lang),
            urlencoding::encode(text)
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }
        let body: Value = response.json().await?;
        parse_google_response(&body)
    }
}

/// Concatenate the translated segments of a `translate_a/single` reply.
///
/// The reply is a nested array whose first element lists
/// `[translated, original, ...]` pairs, one per sentence.
pub fn parse_google_response(body: &Value) -> Result<String, TranslationError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::Malformed("missing segment list".to_string()))?;
    let translated: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    if translated.is_empty() {
        return Err(TranslationError::Malformed("no translated segments".to_string()));
    }
    Ok(translated)
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslatorStats {
    pub external_calls: usize,
    pub cache_hits: usize,
    pub fallbacks: usize,
}

/// Translator owned by the pipeline for the duration of a run.
pub struct Translator<B> {
    backend: RetryTranslate<B>,
    config: TranslatorConfig,
    cache: HashMap<String, String>,
    stats: TranslatorStats,
}

impl<B> fmt::Debug for Translator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("backend", &self.backend)
            .field("target_lang", &self.config.target_lang)
            .field("cached", &self.cache.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<B> Translator<B>
where
    B: TranslateBackend,
{
    pub fn new(backend: B, config: TranslatorConfig) -> Self {
        Self {
            backend: RetryTranslate::new(backend, config.max_retries, config.retry_delay),
            config,
            cache: HashMap::new(),
            stats: TranslatorStats::default(),
        }
    }

    /// Seed the cache, typically from [`load_cache`].
    pub fn with_cache(mut self, cache: HashMap<String, String>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &HashMap<String, String> {
        &self.cache
    }

    pub fn stats(&self) -> TranslatorStats {
        self.stats
    }

    /// Translate `text` into the target language.
    ///
    /// Never fails: empty input is returned as is without a call, and a
    /// service failure after all retries returns the original text (which is
    /// not cached, so a later run tries again).
    pub async fn translate(&mut self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        if let Some(hit) = self.cache.get(text) {
            self.stats.cache_hits += 1;
            return hit.clone();
        }

        let mut parts = Vec::new();
        for chunk in chunk_chars(text, self.config.chunk_chars) {
            self.stats.external_calls += 1;
            let result = self.backend.translate(chunk, &self.config.target_lang).await;
            sleep(self.config.pace_delay).await;
            match result {
                Ok(t) => parts.push(t),
                Err(e) => {
                    self.stats.fallbacks += 1;
                    warn!(error = %e, text = %crate::utils::truncate_for_log(text, 80), "Translation failed; keeping original text");
                    return text.to_string();
                }
            }
        }

        let translated = parts.join(" ");
        debug!(source_chars = text.chars().count(), "Translated text");
        self.cache.insert(text.to_string(), translated.clone());
        translated
    }

    /// Translate an optional/possibly-empty field, `None` when there is
    /// nothing to translate.
    pub async fn translate_opt(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            None
        } else {
            Some(self.translate(text).await)
        }
    }
}

/// Split `text` into consecutive pieces of at most `size` characters.
pub fn chunk_chars(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Load a persisted cache. A missing file is an empty cache; an unreadable
/// one is logged and treated as empty.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_cache(path: &Path) -> HashMap<String, String> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(map) => {
                info!(entries = map.len(), "Loaded translation cache");
                map
            }
            Err(e) => {
                warn!(error = %e, "Translation cache is corrupt; starting empty");
                HashMap::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
        Err(e) => {
            warn!(error = %e, "Translation cache unreadable; starting empty");
            HashMap::new()
        }
    }
}

/// Persist the cache atomically.
#[instrument(level = "info", skip_all, fields(path = %path.display(), entries = cache.len()))]
pub async fn save_cache(path: &Path, cache: &HashMap<String, String>) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(cache)?;
    write_atomic(path, json.as_bytes()).await?;
    info!("Saved translation cache");
    Ok(())
}
