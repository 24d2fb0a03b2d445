//! Error types for the `finpulse-model` crate.

use thiserror::Error;

/// Errors raised by a generation service.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The client is misconfigured (missing API key, bad model name).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The request never produced a response (connect failure, timeout).
    #[error("{provider} request failed: {message}")]
    RequestError { provider: String, message: String },

    /// The service answered with an error.
    #[error("{provider} API returned {status}: {message}")]
    ApiError { provider: String, status: u16, message: String },

    /// The service answered but produced no text.
    #[error("{provider} returned no text: {reason}")]
    EmptyResponse { provider: String, reason: String },
}

/// A convenience result type for generation operations.
pub type Result<T> = std::result::Result<T, ModelError>;
