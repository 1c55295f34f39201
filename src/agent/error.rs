//! Error types for the agent transport.

use thiserror::Error;

/// Failures of a round trip to the platform.
///
/// A transport error means "no answer". It is never an empty answer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided error message, or the status reason.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl TransportError {
    /// Whether the failure happened before the server produced a response.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::HttpRequest(_))
    }
}

impl From<crate::config::ConfigError> for TransportError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Endpoint(err.to_string())
    }
}
