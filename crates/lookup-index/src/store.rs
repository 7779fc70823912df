//! Immutable index store and its providers

use crate::category::{CategoryGroup, CategoryOrder};
use crate::error::{IndexError, IndexResult};
use crate::item::{IndexItem, ItemId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of the static index, loaded once at startup
pub trait IndexProvider: Send + Sync {
    /// Load every item of the dataset
    ///
    /// # Errors
    /// Returns error if the dataset cannot be read or decoded
    fn load(&self) -> IndexResult<Vec<IndexItem>>;
}

/// In-memory provider, mostly for fixtures and embedded datasets
#[derive(Debug, Clone, Default)]
pub struct StaticIndexProvider {
    items: Vec<IndexItem>,
}

impl StaticIndexProvider {
    /// Wrap a fixed item list
    #[inline]
    #[must_use]
    pub fn new(items: Vec<IndexItem>) -> Self {
        Self { items }
    }
}

impl IndexProvider for StaticIndexProvider {
    fn load(&self) -> IndexResult<Vec<IndexItem>> {
        Ok(self.items.clone())
    }
}

/// Provider reading a JSON or YAML dataset file
///
/// The document is either a bare list of items or an object with an
/// `items` list. Extra keys on an item (full-record text) are ignored.
#[derive(Debug, Clone)]
pub struct FileIndexProvider {
    path: PathBuf,
}

impl FileIndexProvider {
    /// Create provider for path
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Dataset path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexProvider for FileIndexProvider {
    fn load(&self) -> IndexResult<Vec<IndexItem>> {
        read_dataset(&self.path)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetDocument<T> {
    Wrapped { items: Vec<T> },
    Bare(Vec<T>),
}

impl<T> DatasetDocument<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Wrapped { items } | Self::Bare(items) => items,
        }
    }
}

/// Read a dataset file of `T` records, format chosen by extension
///
/// # Errors
/// Returns error on IO failure, unknown extension, or decode failure
pub fn read_dataset<T: DeserializeOwned>(path: impl AsRef<Path>) -> IndexResult<Vec<T>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| IndexError::io_error(path, e))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let document: DatasetDocument<T> = match extension.as_str() {
        "json" => serde_json::from_str(&raw)
            .map_err(|e| IndexError::parse_error(path, e.to_string()))?,
        "yaml" | "yml" => serde_yaml::from_str(&raw)
            .map_err(|e| IndexError::parse_error(path, e.to_string()))?,
        other => return Err(IndexError::UnsupportedFormat(other.to_string())),
    };

    let items = document.into_items();
    tracing::debug!("Loaded {} records from {}", items.len(), path.display());
    Ok(items)
}

/// Static, read-only set of index items
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    items: Vec<IndexItem>,
    positions: HashMap<ItemId, usize>,
    order: CategoryOrder,
}

impl IndexStore {
    /// Build store, enforcing id uniqueness
    ///
    /// # Errors
    /// - `IndexError::DuplicateId` if two items share an id
    /// - `IndexError::EmptyId` if an item has an empty id
    pub fn new(items: Vec<IndexItem>) -> IndexResult<Self> {
        let mut positions = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if item.id.as_str().is_empty() {
                return Err(IndexError::EmptyId);
            }
            if positions.insert(item.id.clone(), idx).is_some() {
                return Err(IndexError::DuplicateId(item.id.to_string()));
            }
        }

        Ok(Self {
            items,
            positions,
            order: CategoryOrder::default(),
        })
    }

    /// Build store from a provider
    ///
    /// # Errors
    /// Propagates provider and uniqueness errors
    pub fn from_provider(provider: &dyn IndexProvider) -> IndexResult<Self> {
        Self::new(provider.load()?)
    }

    /// With category priority
    #[inline]
    #[must_use]
    pub fn with_category_order(mut self, order: CategoryOrder) -> Self {
        self.order = order;
        self
    }

    /// All items, in load order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[IndexItem] {
        &self.items
    }

    /// Look up item by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&IndexItem> {
        self.positions.get(id).map(|&idx| &self.items[idx])
    }

    /// Check whether id exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Category priority in use
    #[inline]
    #[must_use]
    pub fn category_order(&self) -> &CategoryOrder {
        &self.order
    }

    /// Distinct categories of the whole index, ordered
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.order.sort_categories(&self.items)
    }

    /// Group a subset of this store's items by category
    #[must_use]
    pub fn group<'a, I>(&self, items: I) -> Vec<CategoryGroup<'a>>
    where
        I: IntoIterator<Item = &'a IndexItem>,
    {
        self.order.group(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn burglary() -> IndexItem {
        IndexItem::new("s810-02", "Property Crimes").with_field("title", "Burglary")
    }

    #[test]
    fn store_rejects_duplicate_ids() {
        let result = IndexStore::new(vec![burglary(), burglary()]);
        assert!(matches!(result, Err(IndexError::DuplicateId(id)) if id == "s810-02"));
    }

    #[test]
    fn store_rejects_empty_id() {
        let result = IndexStore::new(vec![IndexItem::new("", "Other")]);
        assert!(matches!(result, Err(IndexError::EmptyId)));
    }

    #[test]
    fn store_lookup_by_id() {
        let store = IndexStore::new(vec![burglary()]).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains("s810-02"));
        assert_eq!(store.get("s810-02").map(IndexItem::title), Some("Burglary"));
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn static_provider_roundtrip() {
        let provider = StaticIndexProvider::new(vec![burglary()]);
        let store = IndexStore::from_provider(&provider).unwrap();
        assert_eq!(store.items()[0].id.as_str(), "s810-02");
    }

    #[test]
    fn file_provider_reads_wrapped_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"items":[{{"id":"s810-02","category":"Property Crimes","fields":{{"title":"Burglary"}},"details":{{"example":"ignored"}}}}]}}"#
        )
        .unwrap();

        let store = IndexStore::from_provider(&FileIndexProvider::new(file.path())).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].title(), "Burglary");
    }

    #[test]
    fn file_provider_reads_bare_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "- id: ord-37-28\n  category: Noise\n  fields:\n    title: Loud Music\n    jurisdiction: City of Miami"
        )
        .unwrap();

        let items = FileIndexProvider::new(file.path()).load().unwrap();
        assert_eq!(items[0].field("jurisdiction"), Some("City of Miami"));
    }

    #[test]
    fn file_provider_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let result = FileIndexProvider::new(file.path()).load();
        assert!(matches!(result, Err(IndexError::UnsupportedFormat(ext)) if ext == "csv"));
    }

    #[test]
    fn file_provider_reports_missing_file() {
        let result = FileIndexProvider::new("/nonexistent/statutes.json").load();
        assert!(matches!(result, Err(IndexError::Io { .. })));
    }
}
