//! Error types for the scraper.
//!
//! Most of these never reach `main`: the pipeline catches them at the
//! per-page, per-article, or per-image boundary and turns them into log lines.
//! Only start-up failures (bad config, unwritable output) abort a run.

use thiserror::Error;

/// Result type for scraper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Error type for scraper operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport failure or timeout while talking to the remote site
    #[error("request to {url} failed: {source}")]
    Fetch {
        /// The URL being requested
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The remote site answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL being requested
        url: String,
        /// Status code returned by the server
        status: reqwest::StatusCode,
    },

    /// A URL could not be parsed or resolved against the base URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The page could not be turned into an article record
    #[error("could not extract article from {url}: {reason}")]
    Parse {
        /// The article URL
        url: String,
        /// What went wrong
        reason: String,
    },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// External record store could not be reached or queried
    #[error("record store error: {0}")]
    Store(String),
}

impl ScrapeError {
    /// Wrap a transport error with the URL it happened on.
    pub fn fetch(url: &str, source: reqwest::Error) -> Self {
        Self::Fetch {
            url: url.to_string(),
            source,
        }
    }
}
