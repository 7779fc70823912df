//! Engine configuration

use crate::error::{EngineError, EngineResult};
use lookup_cache::CacheConfig;
use lookup_index::{CategoryOrder, LocalMatcher};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lookup engine configuration
///
/// Loadable from TOML; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before the fallback fires, in milliseconds
    pub debounce_ms: u64,
    /// Bound on one resolver call, in seconds
    pub resolver_timeout_secs: u64,
    /// Bound on one detail fetch, in seconds
    pub detail_timeout_secs: u64,
    /// Bound on one derived-field generation, in seconds
    pub derived_timeout_secs: u64,
    /// Item fields searched by the local matcher
    pub match_fields: Vec<String>,
    /// Category priority for grouping
    pub category_priority: Vec<String>,
    /// Resolver identifiers meaning "no confident match"
    pub not_found_sentinels: Vec<String>,
    /// Category assigned to synthesized records
    pub synthesized_category: String,
    /// Resolved fallback queries kept in history
    pub history_limit: usize,
    /// Bounds for the detail and derived caches
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce window
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With resolver timeout
    #[inline]
    #[must_use]
    pub fn with_resolver_timeout(mut self, timeout: Duration) -> Self {
        self.resolver_timeout_secs = timeout.as_secs();
        self
    }

    /// With match fields
    #[must_use]
    pub fn with_match_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// With category priority
    #[must_use]
    pub fn with_category_priority<I, S>(mut self, priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_priority = priority.into_iter().map(Into::into).collect();
        self
    }

    /// With history limit
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With cache bounds
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Debounce window
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Resolver timeout
    #[inline]
    #[must_use]
    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_secs)
    }

    /// Detail fetch timeout
    #[inline]
    #[must_use]
    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    /// Derived generation timeout
    #[inline]
    #[must_use]
    pub fn derived_timeout(&self) -> Duration {
        Duration::from_secs(self.derived_timeout_secs)
    }

    /// Matcher over the configured fields
    #[must_use]
    pub fn matcher(&self) -> LocalMatcher {
        LocalMatcher::new(self.match_fields.iter().cloned())
    }

    /// Category order from the priority list
    #[must_use]
    pub fn category_order(&self) -> CategoryOrder {
        CategoryOrder::new(self.category_priority.iter().cloned())
    }

    /// Whether `identifier` is a not-found sentinel
    ///
    /// Trimmed, case-insensitive; an empty identifier counts as not found.
    #[must_use]
    pub fn is_sentinel(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        identifier.is_empty()
            || self
                .not_found_sentinels
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(identifier))
    }

    /// Validate configuration
    ///
    /// # Errors
    /// `EngineError::Config` naming the first offending field
    pub fn validate(&self) -> EngineResult<()> {
        if self.match_fields.is_empty() {
            return Err(EngineError::config("match_fields must not be empty"));
        }
        if self.match_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(EngineError::config("match_fields must not contain blank names"));
        }
        if self.debounce_ms == 0 {
            return Err(EngineError::config("debounce_ms must be > 0"));
        }
        for (name, secs) in [
            ("resolver_timeout_secs", self.resolver_timeout_secs),
            ("detail_timeout_secs", self.detail_timeout_secs),
            ("derived_timeout_secs", self.derived_timeout_secs),
        ] {
            if secs == 0 {
                return Err(EngineError::config(format!("{name} must be > 0")));
            }
        }
        if self.synthesized_category.trim().is_empty() {
            return Err(EngineError::config("synthesized_category must not be empty"));
        }
        self.cache
            .validate()
            .map_err(|e| EngineError::config(e.to_string()))
    }

    /// Parse from TOML text and validate
    ///
    /// # Errors
    /// Parse or validation failure
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    ///
    /// # Errors
    /// I/O, parse or validation failure
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Serialization failure
    pub fn to_toml_string(&self) -> EngineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 800,
            resolver_timeout_secs: 30,
            detail_timeout_secs: 30,
            derived_timeout_secs: 60,
            match_fields: vec!["title".to_string(), "code".to_string()],
            category_priority: Vec::new(),
            not_found_sentinels: vec!["N/A".to_string(), "Not Found".to_string()],
            synthesized_category: "AI Result".to_string(),
            history_limit: 5,
            cache: CacheConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(800));
        assert_eq!(config.resolver_timeout(), Duration::from_secs(30));
        assert_eq!(config.history_limit, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sentinel_is_trimmed_and_case_insensitive() {
        let config = EngineConfig::default();
        assert!(config.is_sentinel("N/A"));
        assert!(config.is_sentinel("  n/a "));
        assert!(config.is_sentinel("NOT FOUND"));
        assert!(config.is_sentinel(""));
        assert!(config.is_sentinel("   "));
        assert!(!config.is_sentinel("F.S. § 812.014"));
    }

    #[test]
    fn empty_match_fields_rejected() {
        let config = EngineConfig::default().with_match_fields(Vec::<String>::new());
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = EngineConfig::default();
        config.derived_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("derived_timeout_secs"));
    }

    #[test]
    fn zero_cache_capacity_rejected() {
        let config = EngineConfig::default().with_cache(CacheConfig::new().with_max_entries(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            debounce_ms = 500
            match_fields = ["title", "number", "jurisdiction"]

            [cache]
            max_entries = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.match_fields.len(), 3);
        assert_eq!(config.cache.max_entries, Some(100));
        assert_eq!(config.synthesized_category, "AI Result");
    }

    #[test]
    fn toml_round_trip() {
        let config = EngineConfig::default().with_category_priority(["Property Crimes"]);
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "history_limit = 3").unwrap();
        let config = EngineConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.history_limit, 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::from_toml_file("/nonexistent/lookup.toml").unwrap_err();
        assert!(matches!(err, EngineError::ConfigIo { .. }));
    }
}
