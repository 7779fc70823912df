//! Testing utilities for the lookup workspace
//!
//! Shared fixtures and scripted collaborators with call logs and
//! controllable latency.

#![allow(missing_docs)]

use async_trait::async_trait;
use lookup_engine::{
    DetailError, DetailProvider, DerivedFieldGenerator, EngineConfig, FallbackResolver, FullRecord,
    GenerationError, LookupEngine, RawResolverOutput, ResolverError,
};
use lookup_index::{IndexItem, ItemId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// (id, category, code, title)
const STATUTES: &[(&str, &str, &str, &str)] = &[
    ("s784-03", "Crimes Against Persons", "F.S. § 784.03", "Battery"),
    ("s784-021", "Crimes Against Persons", "F.S. § 784.021", "Aggravated Assault"),
    ("s810-02", "Property Crimes", "F.S. § 810.02", "Burglary of a Dwelling"),
    ("s810-02-s", "Property Crimes", "F.S. § 810.02(4)", "Burglary of a Structure"),
    ("s812-014", "Property Crimes", "F.S. § 812.014", "Theft"),
    ("s893-13", "Drug Offenses", "F.S. § 893.13", "Possession of a Controlled Substance"),
    ("s790-01", "Weapons Offenses", "F.S. § 790.01", "Carrying a Concealed Weapon"),
    ("s316-193", "Traffic Offenses", "F.S. § 316.193", "Driving Under the Influence"),
    ("s843-02", "Public Order & Obstruction", "F.S. § 843.02", "Resisting Officer Without Violence"),
];

pub fn statute_items() -> Vec<IndexItem> {
    STATUTES
        .iter()
        .map(|(id, category, code, title)| {
            IndexItem::new(*id, *category)
                .with_field("code", *code)
                .with_field("title", *title)
        })
        .collect()
}

pub fn statute_records() -> Vec<FullRecord> {
    statute_items()
        .iter()
        .map(|item| {
            FullRecord::from_item(item)
                .with_detail("description", format!("Practical summary of {}", item.title()))
                .with_detail("full_text", format!("Full statutory text of {}", item.title()))
                .with_detail("example", format!("Example applying {}", item.title()))
        })
        .collect()
}

pub fn statute_config() -> EngineConfig {
    lookup_engine::FeatureProfile::Statutes.config()
}

/// Engine over the statute fixtures with the given collaborators
pub fn statute_engine(
    resolver: Option<Arc<ScriptedResolver>>,
    detail: Arc<CountingDetailProvider>,
    generator: Option<Arc<ScriptedGenerator>>,
) -> LookupEngine {
    let mut builder = LookupEngine::builder(statute_config())
        .items(statute_items())
        .unwrap()
        .detail_provider(detail);
    if let Some(resolver) = resolver {
        builder = builder.resolver(resolver);
    }
    if let Some(generator) = generator {
        builder = builder.generator(generator);
    }
    builder.build().unwrap()
}

/// Resolver answering from a script, logging every query
pub struct ScriptedResolver {
    answers: Mutex<HashMap<String, Result<RawResolverOutput, ResolverError>>>,
    latency: Mutex<HashMap<String, Duration>>,
    default_latency: Duration,
    calls: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    /// Every unscripted query answers the not-found sentinel
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(HashMap::new()),
            latency: Mutex::new(HashMap::new()),
            default_latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    pub fn answer(self, query: &str, output: RawResolverOutput) -> Self {
        self.answers.lock().insert(query.to_string(), Ok(output));
        self
    }

    pub fn fail(self, query: &str, error: ResolverError) -> Self {
        self.answers.lock().insert(query.to_string(), Err(error));
        self
    }

    pub fn latency_for(self, query: &str, latency: Duration) -> Self {
        self.latency.lock().insert(query.to_string(), latency);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for ScriptedResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FallbackResolver for ScriptedResolver {
    async fn resolve(&self, query: &str) -> Result<RawResolverOutput, ResolverError> {
        self.calls.lock().push(query.to_string());
        let latency = self
            .latency
            .lock()
            .get(query)
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.answers
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(RawResolverOutput::not_found()))
    }
}

/// Dictionary provider counting fetches, optionally failing first
pub struct CountingDetailProvider {
    records: HashMap<ItemId, FullRecord>,
    delay: Duration,
    failures: Mutex<VecDeque<DetailError>>,
    fetches: AtomicUsize,
}

impl CountingDetailProvider {
    pub fn new(records: Vec<FullRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            delay: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn statutes() -> Self {
        Self::new(statute_records())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next fetch with `error`
    pub fn fail_next(self, error: DetailError) -> Self {
        self.failures.lock().push_back(error);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetailProvider for CountingDetailProvider {
    async fn fetch(&self, id: &ItemId) -> Result<Option<FullRecord>, DetailError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.records.get(id).cloned())
    }
}

/// Generator answering from a queue, then a fixed text
pub struct ScriptedGenerator {
    queued: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: String,
    delay: Duration,
    contexts: Mutex<Vec<(ItemId, HashMap<String, String>)>>,
}

impl ScriptedGenerator {
    pub fn new(text: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: text.to_string(),
            delay: Duration::ZERO,
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then(self, answer: Result<String, GenerationError>) -> Self {
        self.queued.lock().push_back(answer);
        self
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn contexts(&self) -> Vec<(ItemId, HashMap<String, String>)> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl DerivedFieldGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        id: &ItemId,
        context: HashMap<String, String>,
    ) -> Result<String, GenerationError> {
        self.contexts.lock().push((id.clone(), context));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let queued = self.queued.lock().pop_front();
        queued.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
