//! Error types for the `finpulse-edgar` crate.

use thiserror::Error;

/// Errors raised while talking to the filing source or reading its payloads.
#[derive(Debug, Error)]
pub enum EdgarError {
    /// The requested entity does not exist (unknown ticker, no filings).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request could not be sent or the connection failed.
    #[error("Request to {url} failed: {source}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A payload or cached file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A local cache file could not be read or written.
    #[error("Cache I/O error at {path}: {source}")]
    Cache {
        /// The cache file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A convenience result type for filing-source operations.
pub type Result<T> = std::result::Result<T, EdgarError>;
