//! Generative fallback resolver and its normalizing adapter

use crate::config::EngineConfig;
use crate::error::ResolverError;
use crate::record::{FullRecord, Origin, DESCRIPTION_PLACEHOLDER, TITLE_PLACEHOLDER};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Unnormalized resolver answer
///
/// `identifier` is either a real identifier (a statute code, an ordinance
/// number) or a sentinel such as `N/A`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResolverOutput {
    /// Identifier or not-found sentinel
    #[serde(default)]
    pub identifier: String,
    /// Free-text fields (title, description, example, ...)
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl RawResolverOutput {
    /// Create output with an identifier
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            fields: IndexMap::new(),
        }
    }

    /// The sentinel answer
    #[must_use]
    pub fn not_found() -> Self {
        Self::new("N/A")
    }

    /// With a free-text field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// External "resolve one record from free text" capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    /// Best-effort resolution of `query`
    async fn resolve(&self, query: &str) -> Result<RawResolverOutput, ResolverError>;
}

/// Normalized resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Synthesized record
    Found(FullRecord),
    /// No confident match, or the resolver failed
    NotFound,
}

impl Resolution {
    /// Whether a record was found
    #[inline]
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Slug used as a synthesized record id
///
/// Lowercased; every character outside `[a-z0-9]` becomes `-`.
#[must_use]
pub fn slug(identifier: &str) -> String {
    identifier
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}

/// Turn a raw answer into a synthesized record or `NotFound`
#[must_use]
pub fn normalize(raw: RawResolverOutput, query: &str, config: &EngineConfig) -> Resolution {
    if config.is_sentinel(&raw.identifier) {
        return Resolution::NotFound;
    }
    let identifier = raw.identifier.trim();

    let mut record = FullRecord::new(slug(identifier), config.synthesized_category.clone())
        .with_field("code", identifier)
        .with_field("title", TITLE_PLACEHOLDER)
        .with_origin(Origin::Synthesized {
            source_query: query.to_string(),
        });

    let mut has_description = false;
    for (name, value) in raw.fields {
        if value.trim().is_empty() || name == "code" {
            continue;
        }
        if name == "description" {
            has_description = true;
        }
        if name == "title" || config.match_fields.iter().any(|f| *f == name) {
            record.fields.insert(name, value);
        } else {
            record.details.insert(name, value);
        }
    }
    if !has_description {
        record
            .details
            .insert("description".to_string(), DESCRIPTION_PLACEHOLDER.to_string());
    }

    Resolution::Found(record)
}

/// Adapter that never fails
///
/// Applies the call timeout, normalizes the answer and converts every
/// failure into [`Resolution::NotFound`], reporting it through tracing and
/// the failure counter.
pub struct ResolverAdapter {
    resolver: Arc<dyn FallbackResolver>,
    config: EngineConfig,
    calls: AtomicU64,
    failures: AtomicU64,
}

impl std::fmt::Debug for ResolverAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverAdapter")
            .field("calls", &self.calls())
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

impl ResolverAdapter {
    /// Wrap `resolver`
    #[must_use]
    pub fn new(resolver: Arc<dyn FallbackResolver>, config: EngineConfig) -> Self {
        Self {
            resolver,
            config,
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Resolve `query`
    pub async fn resolve(&self, query: &str) -> Resolution {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.resolver_timeout();

        let result = match tokio::time::timeout(timeout, self.resolver.resolve(query)).await {
            Ok(result) => result,
            Err(_) => Err(ResolverError::Timeout {
                ms: duration_ms(timeout),
            }),
        };

        match result {
            Ok(raw) => normalize(raw, query, &self.config),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("fallback resolver failed for {:?}: {}", query, e);
                Resolution::NotFound
            }
        }
    }

    /// Resolver invocations so far
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Failed invocations so far
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
