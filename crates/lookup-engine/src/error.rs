//! Error types for the lookup engine
//!
//! Only construction-time problems surface as [`EngineError`]. Failures of
//! the asynchronous collaborators are typed here too, but the engine folds
//! them into cache status or `AiMiss` before a consumer sees them.

use lookup_cache::CacheError;
use lookup_index::{IndexError, ItemId};
use std::path::PathBuf;

/// Construction and configuration errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No tokio runtime to run timers and loads on
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Configuration rejected by validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for the schema
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML
    #[error("failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Local index problem (duplicate ids, unreadable dataset)
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Cache construction problem
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Unknown feature profile name
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),
}

impl EngineError {
    /// Create config error
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for engine construction
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure of the generative fallback resolver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// Service unreachable or returned a failure status
    #[error("resolver unavailable: {0}")]
    Unavailable(String),

    /// Output could not be interpreted
    #[error("malformed resolver output: {0}")]
    Malformed(String),

    /// No answer within the configured bound
    #[error("resolver timed out after {ms}ms")]
    Timeout {
        /// Elapsed bound in milliseconds
        ms: u64,
    },
}

impl ResolverError {
    /// Whether repeating the same query could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Failure of a full-record fetch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetailError {
    /// Provider has no record for the id
    #[error("no detail record for '{0}'")]
    NotFound(ItemId),

    /// Provider failed
    #[error("detail fetch failed: {0}")]
    Failed(String),
}

impl DetailError {
    /// Create failure from any message
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Whether repeating the fetch could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Failure of a derived-field generation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Generator failed
    #[error("generation failed: {0}")]
    Failed(String),

    /// Generator answered with nothing usable
    #[error("generator returned empty output")]
    EmptyOutput,
}

impl GenerationError {
    /// Create failure from any message
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
