//! Lookup Index
//!
//! The synchronous first tier of a lookup: a small, statically loaded set of
//! [`IndexItem`]s searched by case-insensitive substring before any remote
//! or generative call is made.
//!
//! # Components
//!
//! - [`IndexStore`]: immutable item set with unique ids and a category order
//! - [`LocalMatcher`]: substring matching over a configurable field set
//! - [`CategoryOrder`]: priority-driven grouping of items by category
//! - [`IndexProvider`]: where the items come from (fixtures, JSON/YAML files)
//!
//! # Example
//!
//! ```rust,ignore
//! use lookup_index::{IndexItem, IndexStore, LocalMatcher};
//!
//! let store = IndexStore::new(vec![
//!     IndexItem::new("s810-02", "Property Crimes")
//!         .with_field("code", "F.S. § 810.02")
//!         .with_field("title", "Burglary"),
//! ])?;
//!
//! let matcher = LocalMatcher::new(["title", "code"]);
//! let hits = matcher.matches("burg", store.items());
//! assert_eq!(hits.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod category;
pub mod error;
pub mod item;
pub mod matcher;
pub mod store;

pub use category::{CategoryGroup, CategoryOrder};
pub use error::{IndexError, IndexResult};
pub use item::{IndexItem, ItemId};
pub use matcher::LocalMatcher;
pub use store::{read_dataset, FileIndexProvider, IndexProvider, IndexStore, StaticIndexProvider};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the local index
    pub use crate::category::{CategoryGroup, CategoryOrder};
    pub use crate::item::{IndexItem, ItemId};
    pub use crate::matcher::LocalMatcher;
    pub use crate::store::{IndexProvider, IndexStore};
}
