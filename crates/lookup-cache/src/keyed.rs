//! Keyed single-flight cache
//!
//! Ready values live in a moka cache (optionally bounded); in-flight and
//! failed keys live in a `DashMap` of slots. A key is never in both: a
//! successful load inserts the value and removes the slot while holding the
//! slot's entry lock.

use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Bounds for ready values
///
/// Both bounds default to unset: entries live for the whole session. An
/// evicted entry reads as absent again and is reloaded on the next request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of ready entries
    #[serde(default)]
    pub max_entries: Option<u64>,
    /// Time-to-live of a ready entry, in seconds
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Unbounded, session-lived cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With capacity bound
    #[inline]
    #[must_use]
    pub fn with_max_entries(mut self, max: u64) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// With time-to-live
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = Some(ttl.as_secs());
        self
    }

    /// Reject bounds that would make every entry unusable
    ///
    /// # Errors
    /// `CacheError::InvalidConfig` for a zero capacity or zero TTL
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_entries == Some(0) {
            return Err(CacheError::InvalidConfig("max_entries must be > 0".into()));
        }
        if self.ttl_secs == Some(0) {
            return Err(CacheError::InvalidConfig("ttl_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// What a call to [`KeyedCache::request`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new load was started with this ticket
    Started {
        /// Request ticket, unique per cache
        ticket: u64,
    },
    /// A load for the key is already outstanding
    AlreadyLoading,
    /// The key already holds a value
    AlreadyReady,
}

impl RequestOutcome {
    /// Whether a new load was started
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Approximate number of ready entries
    pub ready_entries: u64,
    /// Keys currently loading
    pub loading: usize,
    /// Keys whose last load failed
    pub failed: usize,
    /// Loads started since creation
    pub loads_started: u64,
    /// Responses dropped because their request was no longer current
    pub discarded: u64,
}

#[derive(Debug)]
enum Slot {
    Loading {
        ticket: u64,
        // sender side is held by the load task; closes when it settles
        done: watch::Receiver<()>,
    },
    Failed {
        message: String,
    },
}

const ABANDONED: &str = "load abandoned before completing";

impl Slot {
    /// Loading with its task still alive
    fn is_live(&self) -> bool {
        match self {
            Self::Loading { done, .. } => done.has_changed().is_ok(),
            Self::Failed { .. } => false,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("load panicked: {detail}"),
        None => "load panicked".to_string(),
    }
}

struct Inner<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    name: String,
    ready: Cache<K, Arc<V>>,
    slots: DashMap<K, Slot>,
    tickets: AtomicU64,
    loads_started: AtomicU64,
    discarded: AtomicU64,
    runtime: Handle,
}

/// Per-key lazy cache with single-flight loading
///
/// Cheap to clone; clones share state.
pub struct KeyedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    inner: Arc<Inner<K, V>>,
    timeout: Option<Duration>,
}

impl<K, V> Debug for KeyedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("name", &self.inner.name)
            .field("slots", &self.inner.slots.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<K, V> Clone for KeyedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create cache on the current tokio runtime
    ///
    /// # Errors
    /// - `CacheError::NoRuntime` outside a tokio runtime
    /// - `CacheError::InvalidConfig` for invalid bounds
    pub fn new(name: impl Into<String>, config: CacheConfig) -> CacheResult<Self> {
        let name = name.into();
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime(name.clone()))?;
        Self::with_runtime(name, config, runtime)
    }

    /// Create cache spawning loads on `runtime`
    ///
    /// # Errors
    /// `CacheError::InvalidConfig` for invalid bounds
    pub fn with_runtime(
        name: impl Into<String>,
        config: CacheConfig,
        runtime: Handle,
    ) -> CacheResult<Self> {
        config.validate()?;

        let mut builder = Cache::builder();
        if let Some(max) = config.max_entries {
            builder = builder.max_capacity(max);
        }
        if let Some(ttl) = config.ttl_secs {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.into(),
                ready: builder.build(),
                slots: DashMap::new(),
                tickets: AtomicU64::new(0),
                loads_started: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
                runtime,
            }),
            timeout: None,
        })
    }

    /// With an upper bound on each load
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cache name used in logs
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current entry for `key`
    #[must_use]
    pub fn get(&self, key: &K) -> CacheEntry<V> {
        if let Some(value) = self.inner.ready.get(key) {
            return CacheEntry::Ready(value);
        }
        let slot_entry = self.inner.slots.get(key).map(|slot| match &*slot {
            Slot::Loading { .. } if slot.is_live() => CacheEntry::Loading,
            Slot::Loading { .. } => CacheEntry::Error(ABANDONED.to_string()),
            Slot::Failed { message } => CacheEntry::Error(message.clone()),
        });
        match slot_entry {
            Some(entry) => entry,
            // a load may have settled between the two reads
            None => self
                .inner
                .ready
                .get(key)
                .map_or(CacheEntry::Absent, CacheEntry::Ready),
        }
    }

    /// Start loading `key` unless it is loading or ready
    ///
    /// `load` is only called when a new load starts. Errors are stored as
    /// their `Display` text.
    pub fn request<F, Fut, E>(&self, key: K, load: F) -> RequestOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = watch::channel(());
        let ticket = match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    return RequestOutcome::AlreadyLoading;
                }
                // failed or abandoned: retry
                let ticket = self.next_ticket();
                occupied.insert(Slot::Loading { ticket, done: rx });
                ticket
            }
            Entry::Vacant(vacant) => {
                if self.inner.ready.contains_key(&key) {
                    return RequestOutcome::AlreadyReady;
                }
                let ticket = self.next_ticket();
                vacant.insert(Slot::Loading { ticket, done: rx });
                ticket
            }
        };

        self.inner.loads_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[{}] loading {:?} (ticket {})", self.inner.name, key, ticket);

        let fut = load();
        let inner = Arc::clone(&self.inner);
        let timeout = self.timeout;
        self.inner.runtime.spawn(async move {
            let _done = tx;
            let guarded = async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(panic) => Err(panic_message(panic.as_ref())),
                }
            };
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, guarded)
                    .await
                    .unwrap_or_else(|_| Err(format!("timed out after {}ms", limit.as_millis()))),
                None => guarded.await,
            };
            inner.settle(key, ticket, result);
        });

        RequestOutcome::Started { ticket }
    }

    /// Wait until `key` is no longer loading, then return its entry
    pub async fn settled(&self, key: &K) -> CacheEntry<V> {
        loop {
            let (ticket, mut done) = match self.inner.slots.get(key) {
                Some(slot) => match &*slot {
                    Slot::Loading { ticket, done } => (*ticket, done.clone()),
                    Slot::Failed { .. } => break,
                },
                None => break,
            };
            // only ever errors: the sender never sends, it is dropped after settle
            let _ = done.changed().await;
            self.inner.abandon(key, ticket);
        }
        self.get(key)
    }

    /// Seed a ready value, superseding any outstanding load
    pub fn insert(&self, key: K, value: V) {
        self.inner.slots.remove(&key);
        self.inner.ready.insert(key, Arc::new(value));
    }

    /// Reset `key` to absent; an outstanding load for it will be discarded
    pub fn invalidate(&self, key: &K) {
        self.inner.slots.remove(key);
        self.inner.ready.invalidate(key);
    }

    /// Reset every key to absent
    pub fn invalidate_all(&self) {
        self.inner.slots.clear();
        self.inner.ready.invalidate_all();
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut loading = 0;
        let mut failed = 0;
        for slot in self.inner.slots.iter() {
            if slot.value().is_live() {
                loading += 1;
            } else {
                failed += 1;
            }
        }
        self.inner.ready.run_pending_tasks();
        CacheStats {
            ready_entries: self.inner.ready.entry_count(),
            loading,
            failed,
            loads_started: self.inner.loads_started.load(Ordering::Relaxed),
            discarded: self.inner.discarded.load(Ordering::Relaxed),
        }
    }

    fn next_ticket(&self) -> u64 {
        self.inner.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl<K, V> Inner<K, V>
where
    K: Clone + Debug + Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn settle(&self, key: K, ticket: u64, result: Result<V, String>) {
        let Entry::Occupied(mut occupied) = self.slots.entry(key) else {
            self.discard(ticket);
            return;
        };
        let current = matches!(occupied.get(), Slot::Loading { ticket: t, .. } if *t == ticket);
        if !current {
            self.discard(ticket);
            return;
        }

        match result {
            Ok(value) => {
                self.ready.insert(occupied.key().clone(), Arc::new(value));
                occupied.remove();
            }
            Err(message) => {
                tracing::warn!("[{}] load of {:?} failed: {}", self.name, occupied.key(), message);
                occupied.insert(Slot::Failed { message });
            }
        }
    }

    /// Fail a load whose task ended without settling (cancelled)
    fn abandon(&self, key: &K, ticket: u64) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            if matches!(&*slot, Slot::Loading { ticket: t, .. } if *t == ticket) && !slot.is_live() {
                tracing::warn!("[{}] load of {:?} abandoned (ticket {})", self.name, key, ticket);
                *slot = Slot::Failed {
                    message: ABANDONED.to_string(),
                };
            }
        }
    }

    fn discard(&self, ticket: u64) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[{}] discarded response for ticket {}", self.name, ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cache() -> KeyedCache<String, String> {
        KeyedCache::new("test", CacheConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn request_then_settle_ready() {
        let cache = cache();
        let key = "s810-02".to_string();

        let outcome = cache.request(key.clone(), || async { Ok::<_, String>("Burglary".to_string()) });
        assert!(outcome.is_started());

        let entry = cache.settled(&key).await;
        assert_eq!(entry.value().map(|v| v.as_str()), Some("Burglary"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_while_loading_is_noop() {
        let cache = cache();
        let key = "k".to_string();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            cache.request(key.clone(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, String>("v".to_string())
            });
        }

        assert!(cache.get(&key).is_loading());
        assert!(cache.settled(&key).await.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ready_key_is_not_reloaded() {
        let cache = cache();
        let key = "k".to_string();
        cache.request(key.clone(), || async { Ok::<_, String>("v".to_string()) });
        cache.settled(&key).await;

        let outcome = cache.request(key.clone(), || -> std::future::Ready<Result<String, String>> {
            unreachable!("should use cached value")
        });
        assert_eq!(outcome, RequestOutcome::AlreadyReady);
    }

    #[tokio::test]
    async fn failure_is_stored_and_retryable() {
        let cache = cache();
        let key = "k".to_string();

        cache.request(key.clone(), || async { Err::<String, _>("service unavailable") });
        let entry = cache.settled(&key).await;
        assert_eq!(entry.error(), Some("service unavailable"));

        let outcome = cache.request(key.clone(), || async { Ok::<_, String>("v".to_string()) });
        assert!(outcome.is_started());
        assert!(cache.settled(&key).await.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidated_load_is_discarded() {
        let cache = cache();
        let key = "k".to_string();

        cache.request(key.clone(), || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, String>("stale".to_string())
        });
        cache.invalidate(&key);
        assert_eq!(cache.get(&key).status(), crate::CacheStatus::Absent);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.get(&key).status(), crate::CacheStatus::Absent);
        assert_eq!(cache.stats().discarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_error() {
        let cache = cache().with_timeout(Duration::from_millis(50));
        let key = "k".to_string();

        cache.request(key.clone(), || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, String>("late".to_string())
        });

        let entry = cache.settled(&key).await;
        assert_eq!(entry.error(), Some("timed out after 50ms"));
    }

    #[tokio::test]
    async fn insert_seeds_ready_value() {
        let cache = cache();
        cache.insert("k".to_string(), "seeded".to_string());
        assert!(cache.get(&"k".to_string()).is_ready());
        assert_eq!(
            cache.request("k".to_string(), || async { Ok::<_, String>(String::new()) }),
            RequestOutcome::AlreadyReady
        );
    }

    #[test]
    fn new_outside_runtime_fails() {
        let result: CacheResult<KeyedCache<String, String>> =
            KeyedCache::new("detail", CacheConfig::default());
        assert!(matches!(result, Err(CacheError::NoRuntime(name)) if name == "detail"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = CacheConfig::new().with_max_entries(0);
        assert!(config.validate().is_err());
    }
}
