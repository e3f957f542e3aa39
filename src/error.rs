// src/error.rs
// =============================================================================
// Typed errors for the parts of the auditor that can fail.
//
// None of these abort report generation except ConfigError: bad data found
// during the crawl degrades into a record or a link category instead.
// =============================================================================

use thiserror::Error;

/// Invalid configuration; the run stops before any crawling starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{0}': expected an absolute URL with a scheme and a host")]
    InvalidBaseUrl(String),

    #[error("{field} must be greater than 0")]
    NotPositive { field: &'static str },

    #[error("Invalid notification email address '{0}'")]
    InvalidEmail(String),

    #[error("Invalid proxy URL '{url}': {message}")]
    InvalidProxy { url: String, message: String },

    #[error("Failed to read input file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse input file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single page load attempt failed. The crawler retries these.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Navigation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// Reading or writing record checkpoints and output files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Checkpoint '{path}' belongs to another crawl, it has no record for {base_url}")]
    ForeignCheckpoint { path: String, base_url: String },
}

/// Handing the notification to the mail transport failed.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Mailer error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Network(err.to_string())
    }
}
