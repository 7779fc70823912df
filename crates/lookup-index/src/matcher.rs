//! Case-insensitive substring matching over configured fields

use crate::item::IndexItem;

/// Synchronous local matcher
///
/// An item matches when ANY configured field contains the lowercased query.
/// An empty query is "no filter" and returns every item. Output keeps input
/// order; grouping by category is a separate step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatcher {
    fields: Vec<String>,
}

impl LocalMatcher {
    /// Create matcher over the given field names
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field names searched by this matcher
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Filter `items` by `query`
    #[must_use]
    pub fn matches<'a>(&self, query: &str, items: &'a [IndexItem]) -> Vec<&'a IndexItem> {
        if query.is_empty() {
            return items.iter().collect();
        }
        let needle = query.to_lowercase();
        items
            .iter()
            .filter(|item| self.is_match(item, &needle))
            .collect()
    }

    /// Number of items matching `query`
    #[must_use]
    pub fn count(&self, query: &str, items: &[IndexItem]) -> usize {
        if query.is_empty() {
            return items.len();
        }
        let needle = query.to_lowercase();
        items
            .iter()
            .filter(|item| self.is_match(item, &needle))
            .count()
    }

    /// Check one item against an already-lowercased needle
    #[must_use]
    pub fn is_match(&self, item: &IndexItem, needle: &str) -> bool {
        self.fields.iter().any(|name| {
            item.field(name)
                .is_some_and(|value| value.to_lowercase().contains(needle))
        })
    }
}

impl Default for LocalMatcher {
    /// Matches on `title` and `code`
    fn default() -> Self {
        Self::new(["title", "code"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<IndexItem> {
        vec![
            IndexItem::new("s810-02", "Property Crimes")
                .with_field("title", "Burglary of a Dwelling")
                .with_field("code", "F.S. § 810.02"),
            IndexItem::new("s810-021", "Property Crimes")
                .with_field("title", "Burglary of a Structure")
                .with_field("code", "F.S. § 810.02(4)"),
            IndexItem::new("s784-03", "Crimes Against Persons")
                .with_field("title", "Battery")
                .with_field("code", "F.S. § 784.03"),
        ]
    }

    #[test]
    fn empty_query_returns_everything() {
        let items = items();
        let matcher = LocalMatcher::default();
        assert_eq!(matcher.matches("", &items).len(), 3);
        assert_eq!(matcher.count("", &items), 3);
    }

    #[test]
    fn match_is_case_insensitive_and_keeps_order() {
        let items = items();
        let matcher = LocalMatcher::default();
        let hits = matcher.matches("BURGLARY", &items);
        let ids: Vec<&str> = hits.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["s810-02", "s810-021"]);
    }

    #[test]
    fn any_configured_field_matches() {
        let items = items();
        let matcher = LocalMatcher::default();
        assert_eq!(matcher.count("784.03", &items), 1);
    }

    #[test]
    fn unconfigured_fields_are_ignored() {
        let items = items();
        let matcher = LocalMatcher::new(["title"]);
        assert_eq!(matcher.count("784", &items), 0);
    }

    #[test]
    fn missing_field_never_matches() {
        let items = vec![IndexItem::new("bare", "Other")];
        let matcher = LocalMatcher::default();
        assert!(matcher.matches("bare", &items).is_empty());
    }
}
