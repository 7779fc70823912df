//! Category grouping and priority ordering
//!
//! Items are partitioned by category. Partitions named in the priority list
//! come first, in list order; every other category follows, sorted
//! alphabetically. Unknown categories are never an error.

use crate::item::IndexItem;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Caller-supplied category priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryOrder {
    priority: Vec<String>,
}

/// One category partition, items in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    /// Category name
    pub category: &'a str,
    /// Items of this category
    pub items: Vec<&'a IndexItem>,
}

impl CategoryOrder {
    /// Create from priority list
    #[must_use]
    pub fn new<I, S>(priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            priority: priority.into_iter().map(Into::into).collect(),
        }
    }

    /// Priority list as given
    #[inline]
    #[must_use]
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Position in the priority list (first occurrence)
    #[must_use]
    pub fn position(&self, category: &str) -> Option<usize> {
        self.priority.iter().position(|c| c == category)
    }

    /// Total order over category names
    #[must_use]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.position(a), self.position(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// Distinct categories of `items`, ordered
    #[must_use]
    pub fn sort_categories<'a, I>(&self, items: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a IndexItem>,
    {
        let mut categories: Vec<&str> = Vec::new();
        for item in items {
            if !categories.contains(&item.category.as_str()) {
                categories.push(item.category.as_str());
            }
        }
        categories.sort_by(|a, b| self.compare(a, b));
        categories
    }

    /// Partition `items` by category, ordered by priority
    #[must_use]
    pub fn group<'a, I>(&self, items: I) -> Vec<CategoryGroup<'a>>
    where
        I: IntoIterator<Item = &'a IndexItem>,
    {
        let mut slots: HashMap<&'a str, usize> = HashMap::new();
        let mut groups: Vec<CategoryGroup<'a>> = Vec::new();

        for item in items {
            let category = item.category.as_str();
            let slot = *slots.entry(category).or_insert_with(|| {
                groups.push(CategoryGroup {
                    category,
                    items: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].items.push(item);
        }

        groups.sort_by(|a, b| self.compare(a.category, b.category));
        groups
    }
}
