//! Search state machine
//!
//! Pure transition logic: no timers, no tasks. Every input returns what the
//! driver must do next, and every asynchronous completion is checked
//! against the live [`QueryGeneration`] before it may change state.

use crate::record::FullRecord;
use crate::resolver::Resolution;
use lookup_index::IndexItem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Token minted on every query change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryGeneration(u64);

impl QueryGeneration {
    /// Following generation
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// What a consumer renders against
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchState {
    /// Query empty
    #[default]
    Idle,
    /// At least one local match, in index order
    LocalHit(Vec<IndexItem>),
    /// No local match; `pending` while the fallback timer is armed
    Empty {
        /// Fallback timer armed
        pending: bool,
    },
    /// Fallback fired, answer outstanding
    AiSearching,
    /// Fallback answered with a record
    AiHit(Arc<FullRecord>),
    /// Fallback found nothing or failed
    AiMiss,
}

impl SearchState {
    /// Short state name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LocalHit(_) => "local-hit",
            Self::Empty { .. } => "empty",
            Self::AiSearching => "ai-searching",
            Self::AiHit(_) => "ai-hit",
            Self::AiMiss => "ai-miss",
        }
    }

    /// Whether a fallback is armed or outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Empty { pending: true } | Self::AiSearching)
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalHit(items) => write!(f, "local-hit({})", items.len()),
            Self::Empty { pending } => write!(f, "empty(pending={pending})"),
            Self::AiHit(record) => write!(f, "ai-hit({})", record.id),
            other => f.write_str(other.name()),
        }
    }
}

/// What the driver must do with the fallback timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCommand {
    /// Query unchanged; leave everything as is
    Keep,
    /// Drop any armed timer
    Cancel,
    /// Drop any armed timer and arm a new one
    Arm {
        /// Query to resolve when it fires
        query: String,
        /// Generation the timer belongs to
        generation: QueryGeneration,
    },
}

/// Why a completion was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Query changed since the request was made
    Stale,
    /// State no longer expects this completion
    Unexpected,
}

/// Search state machine
#[derive(Debug, Clone)]
pub struct SearchMachine {
    query: String,
    generation: QueryGeneration,
    state: SearchState,
    fallback_enabled: bool,
}

impl SearchMachine {
    /// Create machine in `Idle`
    #[must_use]
    pub fn new(fallback_enabled: bool) -> Self {
        Self {
            query: String::new(),
            generation: QueryGeneration::default(),
            state: SearchState::Idle,
            fallback_enabled,
        }
    }

    /// Current query
    #[inline]
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Live generation
    #[inline]
    #[must_use]
    pub fn generation(&self) -> QueryGeneration {
        self.generation
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Whether a fallback resolver is configured
    #[inline]
    #[must_use]
    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Apply a query change with its local matches
    ///
    /// An unchanged query is ignored. Otherwise a new generation is minted,
    /// which makes every outstanding completion stale.
    pub fn on_query(&mut self, query: &str, matches: Vec<IndexItem>) -> FallbackCommand {
        if query == self.query {
            return FallbackCommand::Keep;
        }
        self.query = query.to_string();
        self.generation = self.generation.next();

        if query.is_empty() {
            self.state = SearchState::Idle;
            return FallbackCommand::Cancel;
        }
        if !matches.is_empty() {
            self.state = SearchState::LocalHit(matches);
            return FallbackCommand::Cancel;
        }
        if !self.fallback_enabled {
            self.state = SearchState::Empty { pending: false };
            return FallbackCommand::Cancel;
        }
        self.state = SearchState::Empty { pending: true };
        FallbackCommand::Arm {
            query: self.query.clone(),
            generation: self.generation,
        }
    }

    /// Apply a fired timer; returns the query to resolve
    ///
    /// # Errors
    /// `Rejection` when the timer is stale or the state is not armed
    pub fn on_fire(&mut self, generation: QueryGeneration) -> Result<String, Rejection> {
        if generation != self.generation {
            return Err(Rejection::Stale);
        }
        if self.state != (SearchState::Empty { pending: true }) {
            return Err(Rejection::Unexpected);
        }
        self.state = SearchState::AiSearching;
        Ok(self.query.clone())
    }

    /// Apply a resolver answer
    ///
    /// # Errors
    /// `Rejection` when the answer is stale or nothing is outstanding
    pub fn on_resolved(
        &mut self,
        generation: QueryGeneration,
        resolution: Resolution,
    ) -> Result<&SearchState, Rejection> {
        if generation != self.generation {
            return Err(Rejection::Stale);
        }
        if self.state != SearchState::AiSearching {
            return Err(Rejection::Unexpected);
        }
        self.state = match resolution {
            Resolution::Found(record) => SearchState::AiHit(Arc::new(record)),
            Resolution::NotFound => SearchState::AiMiss,
        };
        Ok(&self.state)
    }
}

impl Default for SearchMachine {
    fn default() -> Self {
        Self::new(true)
    }
}
