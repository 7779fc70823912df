//! Error types for HTTP collaborators

use lookup_engine::{DetailError, GenerationError, ResolverError};

/// Errors talking to a generative HTTP endpoint
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Endpoint URL rejected
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Client could not be built or the request failed in transit
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Answer could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl HttpError {
    /// Create malformed-response error
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Whether the call timed out in transit
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}

/// Result type alias for HTTP collaborators
pub type HttpResult<T> = Result<T, HttpError>;

impl From<HttpError> for ResolverError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Malformed(message) => Self::Malformed(message),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl From<HttpError> for DetailError {
    fn from(err: HttpError) -> Self {
        Self::Failed(err.to_string())
    }
}

impl From<HttpError> for GenerationError {
    fn from(err: HttpError) -> Self {
        Self::Failed(err.to_string())
    }
}
