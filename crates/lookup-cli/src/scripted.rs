//! Canned resolver for replaying keystroke sessions

use anyhow::{bail, Result};
use async_trait::async_trait;
use lookup_engine::{FallbackResolver, RawResolverOutput, ResolverError};
use std::collections::HashMap;
use std::time::Duration;

/// Resolver answering from a fixed table after a fixed latency
///
/// Queries are matched trimmed and case-insensitively; anything else gets
/// the not-found sentinel.
#[derive(Debug, Default)]
pub(crate) struct CannedResolver {
    answers: HashMap<String, RawResolverOutput>,
    latency: Duration,
}

impl CannedResolver {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            answers: HashMap::new(),
            latency,
        }
    }

    /// Add answers given as `query=identifier|title`
    pub(crate) fn with_specs<'a>(mut self, specs: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        for spec in specs {
            let (query, output) = parse_answer_spec(spec)?;
            self.answers.insert(query, output);
        }
        Ok(self)
    }

    pub(crate) fn len(&self) -> usize {
        self.answers.len()
    }
}

fn key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Parse `query=identifier|title`; the title part is optional
pub(crate) fn parse_answer_spec(spec: &str) -> Result<(String, RawResolverOutput)> {
    let Some((query, answer)) = spec.split_once('=') else {
        bail!("answer '{spec}' is not of the form query=identifier|title");
    };
    if query.trim().is_empty() {
        bail!("answer '{spec}' has an empty query");
    }

    let (identifier, title) = match answer.split_once('|') {
        Some((identifier, title)) => (identifier.trim(), Some(title.trim())),
        None => (answer.trim(), None),
    };
    let mut output = RawResolverOutput::new(identifier);
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        output = output.with_field("title", title);
    }
    Ok((key(query), output))
}

#[async_trait]
impl FallbackResolver for CannedResolver {
    async fn resolve(&self, query: &str) -> Result<RawResolverOutput, ResolverError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self
            .answers
            .get(&key(query))
            .cloned()
            .unwrap_or_else(RawResolverOutput::not_found))
    }
}
