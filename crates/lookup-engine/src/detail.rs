//! Full-record detail cache

use crate::config::EngineConfig;
use crate::error::{DetailError, EngineResult};
use crate::record::FullRecord;
use async_trait::async_trait;
use lookup_cache::{CacheEntry, CacheStats, KeyedCache, RequestOutcome};
use lookup_index::{read_dataset, IndexResult, ItemId};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Source of full records
///
/// May be a static dictionary or a second generative call. `Ok(None)` means
/// the provider has no record for the id.
#[async_trait]
pub trait DetailProvider: Send + Sync {
    /// Fetch the full record for `id`
    async fn fetch(&self, id: &ItemId) -> Result<Option<FullRecord>, DetailError>;
}

/// Dictionary-backed provider with artificial latency
#[derive(Debug, Clone, Default)]
pub struct StaticDetailProvider {
    records: HashMap<ItemId, FullRecord>,
    delay: Duration,
}

impl StaticDetailProvider {
    /// Create from records, keyed by their ids
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = FullRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            delay: Duration::ZERO,
        }
    }

    /// Load records from a JSON or YAML dataset
    ///
    /// # Errors
    /// Unreadable or malformed dataset
    pub fn from_file(path: impl AsRef<Path>) -> IndexResult<Self> {
        let records: Vec<FullRecord> = read_dataset(path)?;
        Ok(Self::new(records))
    }

    /// With simulated latency before every answer
    #[inline]
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DetailProvider for StaticDetailProvider {
    async fn fetch(&self, id: &ItemId) -> Result<Option<FullRecord>, DetailError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.records.get(id).cloned())
    }
}

/// Per-id lazy cache of full records
///
/// At most one fetch per id is outstanding; a ready record is never
/// refetched until invalidated or evicted.
#[derive(Clone)]
pub struct DetailCache {
    cache: KeyedCache<ItemId, FullRecord>,
    provider: Arc<dyn DetailProvider>,
}

impl std::fmt::Debug for DetailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailCache")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl DetailCache {
    /// Create cache fetching from `provider` on `runtime`
    ///
    /// # Errors
    /// Invalid cache bounds
    pub fn new(
        provider: Arc<dyn DetailProvider>,
        config: &EngineConfig,
        runtime: Handle,
    ) -> EngineResult<Self> {
        let cache = KeyedCache::with_runtime("detail", config.cache, runtime)?
            .with_timeout(config.detail_timeout());
        Ok(Self { cache, provider })
    }

    /// Current entry for `id`
    #[must_use]
    pub fn get(&self, id: &ItemId) -> CacheEntry<FullRecord> {
        self.cache.get(id)
    }

    /// Start fetching `id` unless it is loading or ready
    pub fn request(&self, id: ItemId) -> RequestOutcome {
        let provider = Arc::clone(&self.provider);
        let key = id.clone();
        self.cache.request(id, move || async move {
            match provider.fetch(&key).await {
                Ok(Some(record)) => Ok(record),
                Ok(None) => Err(DetailError::NotFound(key)),
                Err(e) => Err(e),
            }
        })
    }

    /// Store an already complete record (e.g. a synthesized one)
    pub fn seed(&self, record: FullRecord) {
        self.cache.insert(record.id.clone(), record);
    }

    /// Wait for an outstanding fetch of `id` to settle
    pub async fn settled(&self, id: &ItemId) -> CacheEntry<FullRecord> {
        self.cache.settled(id).await
    }

    /// Reset `id` to absent
    pub fn invalidate(&self, id: &ItemId) {
        self.cache.invalidate(id);
    }

    /// Reset every id to absent
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
