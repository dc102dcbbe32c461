//! Thread-safe in-memory caches with interchangeable eviction policies.
//!
//! This crate is meant to sit inside a larger service as the component deciding which
//! entries to keep. It provides:
//!
//! - [`LruCache`]: evicts the least recently used entry
//! - [`LruKCache`]: admits a key into an LRU store only after it was seen `k` times,
//!   keeping one-off accesses and sequential scans out
//! - [`LfuCache`]: evicts the least frequently used entry and periodically ages
//!   frequencies so that formerly hot entries become evictable again
//! - [`ShardedCache`]: spreads keys by hash over independently locked instances of any
//!   of the above to reduce contention
//!
//! All of them implement [`CachePolicy`], so callers can be generic over the policy or
//! hold a `Box<dyn CachePolicy<K, V>>`.
//!
//! # Safety
//!
//! - No unsafe code is used
//! - Entries live in a slot arena and the ordering structures link them by index, so an
//!   evicted entry can never be reached through a stale link
//! - Every operation takes a single lock on the cache (or on one shard)
//!
//! # Examples
//!
//! Basic usage:
//!
//! ```rust
//! use policy_cache::LruCache;
//!
//! let cache = LruCache::with_capacity(2);
//!
//! cache.put("key1", "value1");
//! cache.put("key2", "value2");
//! cache.get("key1");
//! cache.put("key3", "value3");
//!
//! assert_eq!(cache.get("key1"), Some("value1"));
//! assert_eq!(cache.get("key2"), None);
//! ```
//!
//! Frequency-based eviction with aging:
//!
//! ```rust
//! use policy_cache::{LfuCache, LfuConfig};
//!
//! let cache = LfuCache::with_config(LfuConfig::new(2).with_max_average_num(100));
//!
//! cache.put("hot", 1);
//! cache.get("hot");
//! cache.put("cold", 2);
//! cache.put("new", 3);
//!
//! assert_eq!(cache.get("hot"), Some(1));
//! assert_eq!(cache.get("cold"), None);
//! ```
//!
//! Sharing a sharded cache between threads:
//!
//! ```rust
//! use policy_cache::{CachePolicy, ShardedLruCache};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache: Arc<ShardedLruCache<&str, &str>> = Arc::new(ShardedLruCache::lru(100, 4));
//! cache.put("key1", "value1");
//!
//! let cache_in_arc = Arc::clone(&cache);
//! let handle = thread::spawn(move || {
//!     cache_in_arc.put("key2", "value2");
//! });
//!
//! handle.join().unwrap();
//!
//! assert_eq!(cache.get(&"key1"), Some("value1"));
//! assert_eq!(cache.get(&"key2"), Some("value2"));
//! ```

#![forbid(unsafe_code)]
pub mod cache;
pub mod config;
pub mod error;

pub use cache::lfu::LfuCache;
pub use cache::lru::LruCache;
pub use cache::lru_k::LruKCache;
pub use cache::stats::Stats;
pub use cache::{CachePolicy, RemovableCache, ShardedCache, ShardedLfuCache, ShardedLruCache};
pub use config::{DEFAULT_MAX_AVERAGE_NUM, LfuConfig, LruKConfig, ShardCount};
pub use error::InvariantError;
