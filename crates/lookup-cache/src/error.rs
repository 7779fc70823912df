//! Error types for cache construction

/// Errors while creating or driving a cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No tokio runtime to spawn loads on
    #[error("no tokio runtime available for cache '{0}'")]
    NoRuntime(String),

    /// Invalid bound configuration
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
