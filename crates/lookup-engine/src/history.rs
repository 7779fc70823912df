//! Recently resolved fallback queries

use chrono::{DateTime, Utc};
use lookup_index::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One resolved fallback query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Query as typed
    pub query: String,
    /// Id of the synthesized record, `None` for a miss
    pub hit: Option<ItemId>,
    /// When the answer was applied
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Whether the resolver found a record
    #[inline]
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }
}

/// Bounded, most-recent-first, de-duplicated by query
#[derive(Debug, Clone, Default)]
pub struct ResolutionHistory {
    limit: usize,
    entries: VecDeque<HistoryEntry>,
}

impl ResolutionHistory {
    /// Create history keeping at most `limit` queries
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: VecDeque::with_capacity(limit),
        }
    }

    /// Record an applied resolution
    pub fn record(&mut self, query: &str, hit: Option<ItemId>) {
        if self.limit == 0 {
            return;
        }
        self.entries.retain(|e| e.query != query);
        self.entries.push_front(HistoryEntry {
            query: query.to_string(),
            hit,
            at: Utc::now(),
        });
        self.entries.truncate(self.limit);
    }

    /// Entries, most recent first
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
