//! Error types for each stage of the pipeline.
//!
//! Only [`StoreError`] is allowed to end a run. Source errors turn into a
//! zero-item contribution for that source and translation errors turn into
//! the untranslated text.

use thiserror::Error;

/// A source produced nothing usable.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network failure or timeout talking to the origin.
    #[error("source unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("source returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The origin answered but the expected structure was absent.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The source is configured in a way that can never work
    /// (bad selector, bad base URL, missing API key).
    #[error("source misconfigured: {0}")]
    Config(String),
}

/// The external translation service did not produce a result.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation service returned HTTP {0}")]
    Status(u16),

    #[error("malformed translation response: {0}")]
    Malformed(String),
}

/// The snapshot could not be persisted. Fatal to the run.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
