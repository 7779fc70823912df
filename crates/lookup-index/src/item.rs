//! Index items and their identifiers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of an indexed item (e.g. `s810-02`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create id from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lightweight searchable entry of the local index
///
/// Carries only what is needed to list and match an item: its id, its
/// category and a small ordered set of named primary fields (title, code,
/// jurisdiction, ...). Expensive text lives in the full record, loaded on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    /// Unique id within the store
    pub id: ItemId,
    /// Display category used for grouping
    pub category: String,
    /// Named primary fields, in declaration order
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl IndexItem {
    /// Create item without fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ItemId>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            fields: IndexMap::new(),
        }
    }

    /// With an additional named field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get field value by name
    #[inline]
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Title field, falling back to the id
    #[must_use]
    pub fn title(&self) -> &str {
        self.field("title").unwrap_or(self.id.as_str())
    }
}
