//! Lookup Engine
//!
//! Tiered knowledge retrieval: search a small local index first; only when
//! it yields nothing, and only after a quiet period, fall back to a
//! generative resolver. Full records and derived fields are loaded lazily
//! per item and cached for the session.
//!
//! # Architecture
//!
//! ```text
//! set_query ──► LocalMatcher ──► SearchMachine ──► watch<SearchState>
//!                                   │   ▲
//!                         arm/cancel│   │generation-checked completion
//!                                   ▼   │
//!                         DebouncedFallback ──► ResolverAdapter ──► FallbackResolver
//!
//! expand ──────────► DetailCache ──► DetailProvider
//! generate_derived ─► DerivedFieldCache ──► DerivedFieldGenerator
//! ```
//!
//! # Staleness
//!
//! Every query change mints a new [`QueryGeneration`]. Timer firings and
//! resolver answers carry the generation they were started for and are
//! dropped when it is no longer live; they never touch visible state.
//!
//! # Example
//!
//! ```rust,ignore
//! use lookup_engine::{EngineConfig, LookupEngine, SearchState};
//!
//! let engine = LookupEngine::builder(EngineConfig::default())
//!     .items(statutes)?
//!     .resolver(resolver)
//!     .build()?;
//!
//! engine.set_query("credit card");
//! if let SearchState::AiHit(record) = engine.settled_state().await {
//!     println!("{}: {}", record.id, record.title());
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod debounce;
pub mod derived;
pub mod detail;
pub mod engine;
pub mod error;
pub mod history;
pub mod machine;
pub mod profile;
pub mod record;
pub mod resolver;

pub use config::EngineConfig;
pub use debounce::DebouncedFallback;
pub use derived::{DerivedFieldCache, DerivedFieldGenerator, DERIVED_ERROR_TEXT};
pub use detail::{DetailCache, DetailProvider, StaticDetailProvider};
pub use engine::{EngineBuilder, EngineEvent, EngineStats, LookupEngine};
pub use error::{DetailError, EngineError, EngineResult, GenerationError, ResolverError};
pub use history::{HistoryEntry, ResolutionHistory};
pub use machine::{FallbackCommand, QueryGeneration, Rejection, SearchMachine, SearchState};
pub use profile::FeatureProfile;
pub use record::{FullRecord, Origin};
pub use resolver::{normalize, slug, FallbackResolver, RawResolverOutput, Resolution, ResolverAdapter};

pub use lookup_cache::{CacheConfig, CacheEntry, CacheStatus, RequestOutcome};
pub use lookup_index::{IndexItem, IndexStore, ItemId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a lookup engine
    pub use crate::config::EngineConfig;
    pub use crate::engine::{EngineEvent, LookupEngine};
    pub use crate::machine::SearchState;
    pub use crate::record::FullRecord;
    pub use lookup_cache::{CacheEntry, CacheStatus};
    pub use lookup_index::{IndexItem, ItemId};
}
