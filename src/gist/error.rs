//! Error types for the Gist client.

use thiserror::Error;

/// Errors raised by the Gist client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GistError {
    /// Raised when the HTTP client cannot be constructed or a request cannot
    /// be sent (DNS, TLS, connection reset).
    #[error("request failed: {message}")]
    Request {
        /// Message returned by the HTTP client.
        message: String,
    },
    /// Raised when the configured API base URL is unusable.
    #[error("invalid API url {url}: {message}")]
    Url {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("GitHub API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a JSON error document.
        message: String,
        /// Whether the response signalled an exhausted rate limit.
        rate_limited: bool,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode gist response: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },
    /// Raised when a write is attempted without a token.
    #[error("write operations require authentication: set GIST_TOKEN")]
    Unauthenticated,
    /// Raised when uploaded bytes are not valid UTF-8; gists only hold text.
    #[error("{name} is not valid UTF-8 text")]
    NonUtf8 {
        /// Entry name being uploaded.
        name: String,
    },
}

impl GistError {
    /// Returns `true` when the error means the remote throttled us.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::Api {
                rate_limited: true,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for GistError {
    fn from(value: reqwest::Error) -> Self {
        Self::Request {
            message: value.to_string(),
        }
    }
}
