//! Explicitly triggered derived-field generation
//!
//! Independent of the detail cache: expanding an item never generates, and
//! a derived entry is only created by [`DerivedFieldCache::generate`].

use crate::config::EngineConfig;
use crate::error::{EngineResult, GenerationError};
use crate::record::FullRecord;
use async_trait::async_trait;
use lookup_cache::{CacheEntry, CacheStats, KeyedCache, RequestOutcome};
use lookup_index::ItemId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Text shown for a failed generation
pub const DERIVED_ERROR_TEXT: &str = "Error generating elements.";

/// Generator of a secondary text field (e.g. elements of a crime)
#[async_trait]
pub trait DerivedFieldGenerator: Send + Sync {
    /// Generate text for `id` from `context` (`code`, `title`, `text`)
    async fn generate(
        &self,
        id: &ItemId,
        context: HashMap<String, String>,
    ) -> Result<String, GenerationError>;
}

/// Per-id cache of generated text
#[derive(Clone)]
pub struct DerivedFieldCache {
    cache: KeyedCache<ItemId, String>,
    generator: Arc<dyn DerivedFieldGenerator>,
}

impl std::fmt::Debug for DerivedFieldCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedFieldCache")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl DerivedFieldCache {
    /// Create cache generating through `generator` on `runtime`
    ///
    /// # Errors
    /// Invalid cache bounds
    pub fn new(
        generator: Arc<dyn DerivedFieldGenerator>,
        config: &EngineConfig,
        runtime: Handle,
    ) -> EngineResult<Self> {
        let cache = KeyedCache::with_runtime("derived", config.cache, runtime)?
            .with_timeout(config.derived_timeout());
        Ok(Self { cache, generator })
    }

    /// Current entry for `id`
    #[must_use]
    pub fn get(&self, id: &ItemId) -> CacheEntry<String> {
        self.cache.get(id)
    }

    /// Text to display for `id`
    ///
    /// The generated text when ready, [`DERIVED_ERROR_TEXT`] after a
    /// failure, nothing while absent or loading.
    #[must_use]
    pub fn display_text(&self, id: &ItemId) -> Option<String> {
        match self.cache.get(id) {
            CacheEntry::Ready(text) => Some(text.as_ref().clone()),
            CacheEntry::Error(_) => Some(DERIVED_ERROR_TEXT.to_string()),
            CacheEntry::Absent | CacheEntry::Loading => None,
        }
    }

    /// Start generating for `id` from `record` unless loading or ready
    ///
    /// A failed entry is retried.
    pub fn generate(&self, id: ItemId, record: &FullRecord) -> RequestOutcome {
        let record = record.clone();
        self.generate_from(id, async move { record })
    }

    /// Like [`generate`](Self::generate), with the record still to arrive
    ///
    /// `record` is only awaited once a new generation starts, inside it.
    pub fn generate_from<F>(&self, id: ItemId, record: F) -> RequestOutcome
    where
        F: Future<Output = FullRecord> + Send + 'static,
    {
        let generator = Arc::clone(&self.generator);
        let key = id.clone();
        self.cache.request(id, move || async move {
            let context = record.await.derived_context();
            let text = generator.generate(&key, context).await?;
            if text.trim().is_empty() {
                return Err(GenerationError::EmptyOutput);
            }
            Ok(text)
        })
    }

    /// Wait for an outstanding generation of `id` to settle
    pub async fn settled(&self, id: &ItemId) -> CacheEntry<String> {
        self.cache.settled(id).await
    }

    /// Reset `id` to absent
    pub fn invalidate(&self, id: &ItemId) {
        self.cache.invalidate(id);
    }

    /// Cache counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookup_cache::CacheStatus;
    use parking_lot::Mutex;

    struct Scripted {
        answers: Mutex<Vec<Result<String, GenerationError>>>,
        seen: Mutex<Vec<HashMap<String, String>>>,
    }

    #[async_trait]
    impl DerivedFieldGenerator for Scripted {
        async fn generate(
            &self,
            _id: &ItemId,
            context: HashMap<String, String>,
        ) -> Result<String, GenerationError> {
            self.seen.lock().push(context);
            self.answers.lock().remove(0)
        }
    }

    fn theft() -> FullRecord {
        FullRecord::new("s812-014", "Property Crimes")
            .with_field("code", "F.S. § 812.014")
            .with_field("title", "Theft")
            .with_detail("description", "Taking property of another")
    }

    fn cache(answers: Vec<Result<String, GenerationError>>) -> (DerivedFieldCache, Arc<Scripted>) {
        let generator = Arc::new(Scripted {
            answers: Mutex::new(answers),
            seen: Mutex::new(Vec::new()),
        });
        let cache = DerivedFieldCache::new(
            Arc::clone(&generator) as Arc<dyn DerivedFieldGenerator>,
            &EngineConfig::default(),
            Handle::current(),
        )
        .unwrap();
        (cache, generator)
    }

    #[tokio::test]
    async fn generated_text_is_ready() {
        let (cache, generator) = cache(vec![Ok("1. Knowingly obtained property".into())]);
        let record = theft();

        cache.generate(record.id.clone(), &record);
        let entry = cache.settled(&record.id).await;

        assert_eq!(entry.value().map(|t| t.as_str()), Some("1. Knowingly obtained property"));
        assert_eq!(generator.seen.lock()[0]["title"], "Theft");
    }

    #[tokio::test]
    async fn failure_keeps_error_status_and_display_text() {
        let (cache, _) = cache(vec![
            Err(GenerationError::failed("quota exceeded")),
            Ok("1. Element".into()),
        ]);
        let record = theft();

        cache.generate(record.id.clone(), &record);
        let entry = cache.settled(&record.id).await;
        assert_eq!(entry.status(), CacheStatus::Error);
        assert_eq!(cache.display_text(&record.id).as_deref(), Some(DERIVED_ERROR_TEXT));

        // retry
        assert!(cache.generate(record.id.clone(), &record).is_started());
        assert!(cache.settled(&record.id).await.is_ready());
    }

    #[tokio::test]
    async fn empty_output_is_error() {
        let (cache, _) = cache(vec![Ok("   ".into())]);
        let record = theft();

        cache.generate(record.id.clone(), &record);
        let entry = cache.settled(&record.id).await;
        assert_eq!(entry.error(), Some("generator returned empty output"));
    }

    #[tokio::test]
    async fn absent_until_generated() {
        let (cache, _) = cache(Vec::new());
        let id = ItemId::new("s812-014");
        assert_eq!(cache.get(&id).status(), CacheStatus::Absent);
        assert_eq!(cache.display_text(&id), None);
    }
}
