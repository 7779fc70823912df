//! Full records: an index item plus its expensive detail fields

use indexmap::IndexMap;
use lookup_index::{IndexItem, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder for a missing title
pub const TITLE_PLACEHOLDER: &str = "N/A";

/// Placeholder for a missing description
pub const DESCRIPTION_PLACEHOLDER: &str = "No description provided.";

/// Where a record came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Backed by the local index or a detail provider
    Local,
    /// Produced by the fallback resolver; never merged into the index
    Synthesized {
        /// Query that produced it
        source_query: String,
    },
}

/// Superset of an [`IndexItem`] with the expensive fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullRecord {
    /// Item id
    pub id: ItemId,
    /// Display category
    pub category: String,
    /// Primary fields (title, code, ...)
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    /// Expensive fields (description, example, full text, ...)
    #[serde(default)]
    pub details: IndexMap<String, String>,
    /// Provenance
    #[serde(default = "default_origin")]
    pub origin: Origin,
}

fn default_origin() -> Origin {
    Origin::Local
}

impl FullRecord {
    /// Create local record without fields
    #[must_use]
    pub fn new(id: impl Into<ItemId>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            fields: IndexMap::new(),
            details: IndexMap::new(),
            origin: Origin::Local,
        }
    }

    /// Local record seeded from an index item's primary fields
    #[must_use]
    pub fn from_item(item: &IndexItem) -> Self {
        Self {
            id: item.id.clone(),
            category: item.category.clone(),
            fields: item.fields.clone(),
            details: IndexMap::new(),
            origin: Origin::Local,
        }
    }

    /// With a primary field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// With a detail field
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(name.into(), value.into());
        self
    }

    /// With provenance
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Field by name, primary fields first
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .or_else(|| self.details.get(name))
            .map(String::as_str)
    }

    /// Title, or the placeholder
    #[must_use]
    pub fn title(&self) -> &str {
        self.field("title").unwrap_or(TITLE_PLACEHOLDER)
    }

    /// Description, or the placeholder
    #[must_use]
    pub fn description(&self) -> &str {
        self.field("description").unwrap_or(DESCRIPTION_PLACEHOLDER)
    }

    /// Whether produced by the fallback resolver
    #[inline]
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        matches!(self.origin, Origin::Synthesized { .. })
    }

    /// Context handed to a derived-field generator
    ///
    /// `text` is the full text when present, else the description.
    #[must_use]
    pub fn derived_context(&self) -> HashMap<String, String> {
        let mut context = HashMap::with_capacity(3);
        context.insert("code".to_string(), self.field("code").unwrap_or_default().to_string());
        context.insert("title".to_string(), self.title().to_string());
        let text = self
            .field("full_text")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.description());
        context.insert("text".to_string(), text.to_string());
        context
    }
}

impl From<&IndexItem> for FullRecord {
    fn from(item: &IndexItem) -> Self {
        Self::from_item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_item_keeps_primary_fields() {
        let item = IndexItem::new("s810-02", "Property Crimes")
            .with_field("code", "F.S. § 810.02")
            .with_field("title", "Burglary");
        let record = FullRecord::from_item(&item);

        assert_eq!(record.id, item.id);
        assert_eq!(record.title(), "Burglary");
        assert_eq!(record.origin, Origin::Local);
        assert!(record.details.is_empty());
    }

    #[test]
    fn placeholders_for_missing_fields() {
        let record = FullRecord::new("x", "Defenses");
        assert_eq!(record.title(), TITLE_PLACEHOLDER);
        assert_eq!(record.description(), DESCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn derived_context_prefers_full_text() {
        let record = FullRecord::new("s812-014", "Property Crimes")
            .with_field("code", "F.S. § 812.014")
            .with_field("title", "Theft")
            .with_detail("description", "Taking property of another")
            .with_detail("full_text", "(1) A person commits theft if ...");

        let context = record.derived_context();
        assert_eq!(context["code"], "F.S. § 812.014");
        assert_eq!(context["text"], "(1) A person commits theft if ...");
    }

    #[test]
    fn derived_context_falls_back_to_description() {
        let record = FullRecord::new("s812-014", "Property Crimes")
            .with_detail("description", "Taking property of another")
            .with_detail("full_text", "  ");

        let context = record.derived_context();
        assert_eq!(context["text"], "Taking property of another");
        assert_eq!(context["code"], "");
    }

    #[test]
    fn origin_serializes_tagged() {
        let origin = Origin::Synthesized {
            source_query: "credit card".into(),
        };
        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["kind"], "synthesized");
        assert_eq!(json["source_query"], "credit card");
    }

    #[test]
    fn record_deserializes_with_default_origin() {
        let record: FullRecord = serde_json::from_str(
            r#"{"id":"s810-02","category":"Property Crimes","details":{"example":"..."}}"#,
        )
        .unwrap();
        assert_eq!(record.origin, Origin::Local);
        assert_eq!(record.field("example"), Some("..."));
    }
}
