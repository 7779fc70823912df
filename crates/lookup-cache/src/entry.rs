//! Visible per-key cache state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Status tag of a [`CacheEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Never requested, or invalidated
    Absent,
    /// A load is outstanding
    Loading,
    /// Value available
    Ready,
    /// Last load failed
    Error,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Snapshot of one key's cache state
#[derive(Debug)]
pub enum CacheEntry<T> {
    /// Never requested, or invalidated
    Absent,
    /// A load is outstanding
    Loading,
    /// Loaded value
    Ready(Arc<T>),
    /// Failure message of the last load
    Error(String),
}

impl<T> CacheEntry<T> {
    /// Status tag
    #[inline]
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        match self {
            Self::Absent => CacheStatus::Absent,
            Self::Loading => CacheStatus::Loading,
            Self::Ready(_) => CacheStatus::Ready,
            Self::Error(_) => CacheStatus::Error,
        }
    }

    /// Loaded value, if ready
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Failure message, if errored
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Whether a value is available
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether a load is outstanding
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Absent => Self::Absent,
            Self::Loading => Self::Loading,
            Self::Ready(value) => Self::Ready(Arc::clone(value)),
            Self::Error(message) => Self::Error(message.clone()),
        }
    }
}

impl<T: PartialEq> PartialEq for CacheEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Absent, Self::Absent) | (Self::Loading, Self::Loading) => true,
            (Self::Ready(a), Self::Ready(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self::Absent
    }
}
