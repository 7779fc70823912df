//! Error types for the local index

use std::path::PathBuf;

/// Errors while building or loading an index
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Two items share the same id
    #[error("duplicate item id: '{0}'")]
    DuplicateId(String),

    /// Item id is empty
    #[error("item id must not be empty")]
    EmptyId,

    /// IO error while reading a dataset
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset could not be decoded
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Dataset file extension is not supported
    #[error("unsupported dataset format: '{0}'")]
    UnsupportedFormat(String),
}

impl IndexError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_display() {
        let err = IndexError::DuplicateId("s810-02".to_string());
        assert_eq!(err.to_string(), "duplicate item id: 's810-02'");
    }

    #[test]
    fn parse_error_display() {
        let err = IndexError::parse_error("statutes.json", "expected list");
        assert!(err.to_string().contains("statutes.json"));
        assert!(err.to_string().contains("expected list"));
    }
}
