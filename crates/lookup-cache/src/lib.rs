//! Lookup Cache
//!
//! Session-lived, per-key caches for values that are expensive to produce
//! (full records, generated text). Every key has exactly one visible
//! [`CacheEntry`]: absent, loading, ready or error.
//!
//! # Guarantees
//!
//! - **Single flight**: at most one outstanding load per key. The check and
//!   the transition to `loading` happen under the key's map lock, before the
//!   loader future is ever polled.
//! - **Ticketed settlement**: a load settles its key only if the key is still
//!   loading *that* request. Invalidated or superseded responses are dropped.
//! - **No poisoning**: a failed load leaves an `error` entry; requesting the
//!   key again retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use lookup_cache::{CacheConfig, KeyedCache};
//!
//! let cache: KeyedCache<String, String> = KeyedCache::new("detail", CacheConfig::default())?;
//! cache.request("s810-02".to_string(), || async { Ok::<_, String>("Burglary".to_string()) });
//! let entry = cache.settled(&"s810-02".to_string()).await;
//! assert!(entry.is_ready());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod entry;
pub mod error;
pub mod keyed;

pub use entry::{CacheEntry, CacheStatus};
pub use error::{CacheError, CacheResult};
pub use keyed::{CacheConfig, CacheStats, KeyedCache, RequestOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
