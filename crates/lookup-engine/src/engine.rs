//! Lookup engine facade
//!
//! Wires the local index, the debounced fallback, the search state machine
//! and the two per-id caches behind one cheap-to-clone handle.
//!
//! # Ordering
//!
//! The machine and the fallback timer share one mutex. Every state change
//! is published to subscribers while that mutex is held, so subscribers
//! observe transitions in the order they were applied.

use crate::config::EngineConfig;
use crate::debounce::DebouncedFallback;
use crate::derived::{DerivedFieldCache, DerivedFieldGenerator};
use crate::detail::{DetailCache, DetailProvider, StaticDetailProvider};
use crate::error::{EngineError, EngineResult};
use crate::history::{HistoryEntry, ResolutionHistory};
use crate::machine::{FallbackCommand, QueryGeneration, Rejection, SearchMachine, SearchState};
use crate::record::FullRecord;
use crate::resolver::{FallbackResolver, Resolution, ResolverAdapter};
use lookup_cache::{CacheEntry, RequestOutcome};
use lookup_index::{IndexItem, IndexStore, ItemId, LocalMatcher};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Consumer input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Query text changed
    QueryChanged(String),
    /// Item expanded
    Expand(ItemId),
    /// Derived field explicitly requested
    GenerateDerived(ItemId),
    /// Reset an item's detail entry
    InvalidateDetail(ItemId),
    /// Reset an item's derived entry
    InvalidateDerived(ItemId),
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Fallback resolver invocations
    pub resolver_calls: u64,
    /// Resolver invocations that failed or timed out
    pub resolver_failures: u64,
    /// Timer firings and resolutions dropped as stale
    pub stale_discards: u64,
    /// Detail fetches started
    pub detail_fetches: u64,
    /// Detail responses dropped after invalidation
    pub detail_discards: u64,
    /// Derived generations started
    pub derived_generations: u64,
}

struct SearchSlot {
    machine: SearchMachine,
    timer: DebouncedFallback,
}

struct EngineInner {
    config: EngineConfig,
    store: IndexStore,
    matcher: LocalMatcher,
    resolver: Option<ResolverAdapter>,
    details: DetailCache,
    derived: Option<DerivedFieldCache>,
    search: Mutex<SearchSlot>,
    state_tx: watch::Sender<SearchState>,
    history: Mutex<ResolutionHistory>,
    stale_discards: AtomicU64,
    runtime: Handle,
}

/// Local-first lookup engine
///
/// Cheap to clone; clones share state. Timers and fetches run on the tokio
/// runtime captured at build time.
#[derive(Clone)]
pub struct LookupEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for LookupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupEngine")
            .field("items", &self.inner.store.len())
            .field("fallback", &self.inner.resolver.is_some())
            .field("state", &self.state().name())
            .finish_non_exhaustive()
    }
}

impl LookupEngine {
    /// Start building an engine
    #[must_use]
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Local index
    #[inline]
    #[must_use]
    pub fn store(&self) -> &IndexStore {
        &self.inner.store
    }

    /// Whether a fallback resolver is configured
    #[inline]
    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.inner.resolver.is_some()
    }

    /// Current query
    #[must_use]
    pub fn query(&self) -> String {
        self.inner.search.lock().machine.query().to_string()
    }

    /// Live query generation
    #[must_use]
    pub fn generation(&self) -> QueryGeneration {
        self.inner.search.lock().machine.generation()
    }

    /// Snapshot of the search state
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribe to search state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state_tx.subscribe()
    }

    /// Wait until no fallback is armed or outstanding, then return the state
    pub async fn settled_state(&self) -> SearchState {
        let mut rx = self.subscribe();
        // the sender lives as long as `self`
        let settled = match rx.wait_for(|state| !state.is_busy()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Local matches for `query`, without changing state
    #[must_use]
    pub fn local_matches(&self, query: &str) -> Vec<&IndexItem> {
        self.inner.matcher.matches(query, self.inner.store.items())
    }

    /// Apply a query change and return the resulting state
    pub fn set_query(&self, query: &str) -> SearchState {
        self.inner.apply_query(query)
    }

    /// Expand an item: ensure its full record is loaded or loading
    ///
    /// The record of the current AI hit is complete already and is stored
    /// without a fetch.
    pub fn expand(&self, id: impl Into<ItemId>) -> RequestOutcome {
        let id = id.into();
        if let SearchState::AiHit(record) = &*self.inner.state_tx.borrow() {
            if record.id == id && !self.inner.details.get(&id).is_ready() {
                self.inner.details.seed(record.as_ref().clone());
            }
        }
        let outcome = self.inner.details.request(id.clone());
        tracing::debug!("expand {} -> {:?}", id, outcome);
        outcome
    }

    /// Generate the derived field of an item on explicit request
    ///
    /// Uses the loaded full record when there is one, else the AI hit or
    /// the index item. While the full record is still loading, generation
    /// waits for it. Returns `None` when no generator is configured or
    /// the id is unknown.
    pub fn generate_derived(&self, id: impl Into<ItemId>) -> Option<RequestOutcome> {
        let id = id.into();
        let Some(derived) = &self.inner.derived else {
            tracing::warn!("derived generation requested for {} without a generator", id);
            return None;
        };
        let Some(record) = self.inner.record_for(&id) else {
            tracing::warn!("derived generation requested for unknown id {}", id);
            return None;
        };
        if !self.inner.details.get(&id).is_loading() {
            return Some(derived.generate(id, &record));
        }

        // build the context from the full record once its fetch settles
        let inner = Arc::clone(&self.inner);
        let key = id.clone();
        Some(derived.generate_from(id, async move {
            match inner.details.settled(&key).await {
                CacheEntry::Ready(full) => full.as_ref().clone(),
                _ => record,
            }
        }))
    }

    /// Apply a consumer event
    pub fn dispatch(&self, event: EngineEvent) {
        match event {
            EngineEvent::QueryChanged(query) => {
                self.set_query(&query);
            }
            EngineEvent::Expand(id) => {
                self.expand(id);
            }
            EngineEvent::GenerateDerived(id) => {
                self.generate_derived(id);
            }
            EngineEvent::InvalidateDetail(id) => self.invalidate_detail(&id),
            EngineEvent::InvalidateDerived(id) => self.invalidate_derived(&id),
        }
    }

    /// Detail entry for `id`
    #[must_use]
    pub fn detail(&self, id: &ItemId) -> CacheEntry<FullRecord> {
        self.inner.details.get(id)
    }

    /// Derived entry for `id`; absent when no generator is configured
    #[must_use]
    pub fn derived(&self, id: &ItemId) -> CacheEntry<String> {
        self.inner
            .derived
            .as_ref()
            .map_or(CacheEntry::Absent, |d| d.get(id))
    }

    /// Derived text to display for `id`
    #[must_use]
    pub fn derived_text(&self, id: &ItemId) -> Option<String> {
        self.inner.derived.as_ref().and_then(|d| d.display_text(id))
    }

    /// Wait for an outstanding detail fetch of `id`
    pub async fn settled_detail(&self, id: &ItemId) -> CacheEntry<FullRecord> {
        self.inner.details.settled(id).await
    }

    /// Wait for an outstanding derived generation of `id`
    pub async fn settled_derived(&self, id: &ItemId) -> CacheEntry<String> {
        match &self.inner.derived {
            Some(derived) => derived.settled(id).await,
            None => CacheEntry::Absent,
        }
    }

    /// Reset the detail entry of `id`; an in-flight fetch is discarded
    pub fn invalidate_detail(&self, id: &ItemId) {
        self.inner.details.invalidate(id);
    }

    /// Reset the derived entry of `id`; an in-flight generation is discarded
    pub fn invalidate_derived(&self, id: &ItemId) {
        if let Some(derived) = &self.inner.derived {
            derived.invalidate(id);
        }
    }

    /// Resolved fallback queries, most recent first
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.lock().entries()
    }

    /// Counter snapshot
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let detail = self.inner.details.stats();
        let derived = self.inner.derived.as_ref().map(DerivedFieldCache::stats);
        EngineStats {
            resolver_calls: self.inner.resolver.as_ref().map_or(0, ResolverAdapter::calls),
            resolver_failures: self.inner.resolver.as_ref().map_or(0, ResolverAdapter::failures),
            stale_discards: self.inner.stale_discards.load(Ordering::Relaxed),
            detail_fetches: detail.loads_started,
            detail_discards: detail.discarded,
            derived_generations: derived.map_or(0, |s| s.loads_started),
        }
    }
}

impl EngineInner {
    fn apply_query(self: &Arc<Self>, query: &str) -> SearchState {
        // an empty query is Idle regardless of matches
        let matches: Vec<IndexItem> = if query.is_empty() {
            Vec::new()
        } else {
            self.matcher
                .matches(query, self.store.items())
                .into_iter()
                .cloned()
                .collect()
        };

        let mut slot = self.search.lock();
        match slot.machine.on_query(query, matches) {
            FallbackCommand::Keep => return slot.machine.state().clone(),
            FallbackCommand::Cancel => {
                slot.timer.cancel();
            }
            FallbackCommand::Arm { query, generation } => {
                let weak = Arc::downgrade(self);
                slot.timer.schedule(generation, move || fire(&weak, generation));
                tracing::debug!("no local match for {:?}; fallback armed ({})", query, generation);
            }
        }
        let state = slot.machine.state().clone();
        tracing::debug!("query {:?} -> {}", query, state);
        self.state_tx.send_replace(state.clone());
        state
    }

    fn on_fire(self: &Arc<Self>, generation: QueryGeneration) {
        let mut slot = self.search.lock();
        slot.timer.fired(generation);
        let query = match slot.machine.on_fire(generation) {
            Ok(query) => query,
            Err(rejection) => {
                drop(slot);
                self.discard(generation, rejection);
                return;
            }
        };
        self.state_tx.send_replace(slot.machine.state().clone());
        drop(slot);

        tracing::info!("fallback fired for {:?} ({})", query, generation);
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let resolution = match &inner.resolver {
                Some(resolver) => resolver.resolve(&query).await,
                None => Resolution::NotFound,
            };
            inner.on_resolved(generation, &query, resolution);
        });
    }

    fn on_resolved(&self, generation: QueryGeneration, query: &str, resolution: Resolution) {
        let hit = match &resolution {
            Resolution::Found(record) => Some(record.id.clone()),
            Resolution::NotFound => None,
        };

        let mut slot = self.search.lock();
        match slot.machine.on_resolved(generation, resolution).cloned() {
            Ok(state) => {
                tracing::debug!("fallback for {:?} -> {}", query, state);
                self.state_tx.send_replace(state);
                drop(slot);
                self.history.lock().record(query, hit);
            }
            Err(rejection) => {
                drop(slot);
                self.discard(generation, rejection);
            }
        }
    }

    fn discard(&self, generation: QueryGeneration, rejection: Rejection) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("discarded {:?} completion for {}", rejection, generation);
    }

    fn record_for(&self, id: &ItemId) -> Option<FullRecord> {
        if let Some(record) = self.details.get(id).value() {
            return Some(record.as_ref().clone());
        }
        if let SearchState::AiHit(record) = &*self.state_tx.borrow() {
            if record.id == *id {
                return Some(record.as_ref().clone());
            }
        }
        self.store.get(id.as_str()).map(FullRecord::from_item)
    }
}

fn fire(inner: &Weak<EngineInner>, generation: QueryGeneration) {
    if let Some(inner) = inner.upgrade() {
        inner.on_fire(generation);
    }
}

/// Builder for [`LookupEngine`]
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<IndexStore>,
    resolver: Option<Arc<dyn FallbackResolver>>,
    detail: Option<Arc<dyn DetailProvider>>,
    generator: Option<Arc<dyn DerivedFieldGenerator>>,
    runtime: Option<Handle>,
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("resolver", &self.resolver.is_some())
            .field("detail", &self.detail.is_some())
            .field("generator", &self.generator.is_some())
            .finish_non_exhaustive()
    }
}

impl EngineBuilder {
    /// Create builder
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            resolver: None,
            detail: None,
            generator: None,
            runtime: None,
        }
    }

    /// With local index
    #[must_use]
    pub fn store(mut self, store: IndexStore) -> Self {
        self.store = Some(store);
        self
    }

    /// With local index built from `items`
    ///
    /// # Errors
    /// Duplicate or empty ids
    pub fn items(self, items: Vec<IndexItem>) -> EngineResult<Self> {
        Ok(self.store(IndexStore::new(items)?))
    }

    /// With generative fallback
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn FallbackResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// With full-record source
    #[must_use]
    pub fn detail_provider(mut self, provider: Arc<dyn DetailProvider>) -> Self {
        self.detail = Some(provider);
        self
    }

    /// With derived-field generator
    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn DerivedFieldGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Spawn timers and fetches on `runtime`
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the engine
    ///
    /// Without a detail provider, expanding an item yields its index
    /// fields as the full record.
    ///
    /// # Errors
    /// - `EngineError::Config` for invalid configuration
    /// - `EngineError::NoRuntime` outside a tokio runtime and without `runtime`
    pub fn build(self) -> EngineResult<LookupEngine> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| EngineError::NoRuntime)?,
        };

        let mut store = self.store.unwrap_or_default();
        if !self.config.category_priority.is_empty() {
            store = store.with_category_order(self.config.category_order());
        }

        let detail = match self.detail {
            Some(provider) => provider,
            None => Arc::new(StaticDetailProvider::new(
                store.items().iter().map(FullRecord::from_item),
            )),
        };
        let details = DetailCache::new(detail, &self.config, runtime.clone())?;
        let derived = self
            .generator
            .map(|g| DerivedFieldCache::new(g, &self.config, runtime.clone()))
            .transpose()?;
        let resolver = self
            .resolver
            .map(|r| ResolverAdapter::new(r, self.config.clone()));

        let machine = SearchMachine::new(resolver.is_some());
        let timer = DebouncedFallback::new(self.config.debounce(), runtime.clone());
        let (state_tx, _) = watch::channel(SearchState::Idle);

        tracing::debug!(
            "lookup engine ready: {} items, fallback {}",
            store.len(),
            if resolver.is_some() { "on" } else { "off" }
        );

        Ok(LookupEngine {
            inner: Arc::new(EngineInner {
                matcher: self.config.matcher(),
                history: Mutex::new(ResolutionHistory::new(self.config.history_limit)),
                config: self.config,
                store,
                resolver,
                details,
                derived,
                search: Mutex::new(SearchSlot { machine, timer }),
                state_tx,
                stale_discards: AtomicU64::new(0),
                runtime,
            }),
        })
    }
}
