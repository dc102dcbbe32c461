use crate::cache::lru::LruCore;
use crate::cache::stats::{Counters, Stats};
use crate::cache::{CachePolicy, RandomState, RemovableCache};
use crate::config::LruKConfig;
use crate::error::InvariantError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use tracing::trace;

/// Main store, access history and pending values, kept under a single lock.
#[derive(Debug)]
struct LruKCore<K, V, S> {
    k: usize,
    main: LruCore<K, V, S>,
    history: LruCore<K, usize, S>,
    pending: HashMap<K, V, S>,
}

enum Lookup<V> {
    Hit(V),
    Promoted { value: V, evicted: bool },
    Miss,
}

impl<K, V, S> LruKCore<K, V, S> {
    fn clear(&mut self) {
        self.main.clear();
        self.history.clear();
        self.pending.clear();
    }
}

impl<K, V, S> LruKCore<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    /// Counts one more access to a key outside the main store and returns the new count.
    /// A key pushed out of the history loses its pending value too.
    fn record_access(&mut self, key: &K) -> usize {
        let count = self.history.get(key).copied().unwrap_or(0) + 1;
        if let Some((forgotten, _)) = self.history.put(key.clone(), count) {
            self.pending.remove(&forgotten);
        }
        count
    }

    /// Moves `key` into the main store, returning whether an entry was evicted for it.
    fn promote(&mut self, key: K, value: V) -> bool {
        self.history.remove(&key);
        self.pending.remove(&key);
        trace!(k = self.k, "promoted key into the main store");
        self.main.put(key, value).is_some()
    }

    fn get(&mut self, key: &K) -> Lookup<V> {
        if let Some(value) = self.main.get(key) {
            return Lookup::Hit(value.clone());
        }

        let count = self.record_access(key);
        if count < self.k {
            return Lookup::Miss;
        }

        match self.pending.get(key).cloned() {
            Some(value) => {
                let evicted = self.promote(key.clone(), value.clone());
                Lookup::Promoted { value, evicted }
            }
            None => Lookup::Miss,
        }
    }

    fn put(&mut self, key: K, value: V) -> bool {
        if self.main.contains(&key) {
            return self.main.put(key, value).is_some();
        }

        let count = self.record_access(&key);
        if count >= self.k {
            return self.promote(key, value);
        }

        if self.history.contains(&key) {
            self.pending.insert(key, value);
        }
        false
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.history.remove(key);
        let pending = self.pending.remove(key);
        self.main.remove(key).or(pending)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.main.check_invariants()?;
        self.history.check_invariants()?;

        if self.history.keys().any(|key| self.main.contains(key)) {
            return Err(InvariantError::PromotedKeyInHistory);
        }

        for key in self.pending.keys() {
            if self.main.contains(key) {
                return Err(InvariantError::PromotedKeyInHistory);
            }
            if !self.history.contains(key) {
                return Err(InvariantError::OrphanedPendingValue);
            }
        }

        Ok(())
    }
}

/// Thread-safe LRU-K cache.
///
/// Keys enter the main LRU store only after they have been seen `k` times, either by
/// [`get`](LruKCache::get) or [`put`](LruKCache::put). Until then their access counts are
/// tracked in a bounded LRU history and the most recently offered value is held aside.
/// This keeps one-off accesses, such as sequential scans, from flushing the main store.
#[derive(Debug)]
pub struct LruKCache<K, V, S = RandomState> {
    capacity: usize,
    core: Mutex<LruKCore<K, V, S>>,
    counters: Counters,
}

impl<K, V> LruKCache<K, V, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(capacity: usize, history_capacity: usize, k: usize) -> LruKCache<K, V, RandomState> {
        LruKCache::with_config(LruKConfig::new(capacity, history_capacity, k))
    }

    pub fn with_config(config: LruKConfig) -> LruKCache<K, V, RandomState> {
        LruKCache::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V, S> LruKCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher + Clone,
{
    pub fn with_config_and_hasher(config: LruKConfig, hash_builder: S) -> LruKCache<K, V, S> {
        let core = LruKCore {
            k: config.k.max(1),
            main: LruCore::with_capacity_and_hasher(config.capacity, hash_builder.clone()),
            history: LruCore::with_capacity_and_hasher(
                config.history_capacity,
                hash_builder.clone(),
            ),
            pending: HashMap::with_hasher(hash_builder),
        };

        Self {
            capacity: config.capacity,
            core: Mutex::new(core),
            counters: Counters::default(),
        }
    }
}

impl<K, V, S> LruKCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    /// Updates a key already in the main store. Otherwise records the value as pending
    /// and counts the access, promoting the key as soon as it has been seen `k` times.
    pub fn put(&self, key: K, value: V) {
        let evicted = self.core.lock().put(key, value);
        if evicted {
            self.counters.increment_eviction_count();
        }
    }

    /// Returns the value from the main store. On a miss the access is counted, and a key
    /// reaching `k` accesses with a pending value is promoted and its value returned.
    pub fn get(&self, key: &K) -> Option<V> {
        let lookup = self.core.lock().get(key);
        match lookup {
            Lookup::Hit(value) => {
                self.counters.record_lookup(true);
                Some(value)
            }
            Lookup::Promoted { value, evicted } => {
                if evicted {
                    self.counters.increment_eviction_count();
                }
                self.counters.record_lookup(true);
                Some(value)
            }
            Lookup::Miss => {
                self.counters.record_lookup(false);
                None
            }
        }
    }

    /// Returns the value corresponding to the key or `V::default()` on a miss.
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Returns whether the key is in the main store, without counting an access.
    pub fn contains(&self, key: &K) -> bool {
        self.core.lock().main.contains(key)
    }

    /// Accesses counted for a key that has not been promoted yet.
    pub fn history_count(&self, key: &K) -> Option<usize> {
        self.core.lock().history.peek(key).copied()
    }

    /// Removes the key from the main store and from the history.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.core.lock().remove(key)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.core.lock().check_invariants()
    }
}

impl<K, V, S> LruKCache<K, V, S> {
    /// Clears the main store, the access history and all pending values.
    pub fn purge(&self) {
        self.core.lock().clear();
    }

    /// Number of entries in the main store.
    pub fn len(&self) -> usize {
        self.core.lock().main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn k(&self) -> usize {
        self.core.lock().k
    }

    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }
}

impl<K, V, S> CachePolicy<K, V> for LruKCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn put(&self, key: K, value: V) {
        LruKCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        LruKCache::get(self, key)
    }

    fn purge(&self) {
        LruKCache::purge(self)
    }

    fn len(&self) -> usize {
        LruKCache::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn stats(&self) -> Stats {
        LruKCache::stats(self)
    }

    fn reset_stats(&self) {
        LruKCache::reset_stats(self)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        LruKCache::check_invariants(self)
    }
}

impl<K, V, S> RemovableCache<K, V> for LruKCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn remove(&self, key: &K) {
        LruKCache::remove(self, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_does_not_promote_below_k_accesses() {
        // given
        let cache = LruKCache::new(2, 10, 2);

        // when
        let miss = cache.get(&"k1");

        // then
        assert_eq!(miss, None);
        assert!(!cache.contains(&"k1"));
        assert_eq!(cache.history_count(&"k1"), Some(1));

        cache.put("k1", 1);
        assert!(cache.contains(&"k1"));
        assert_eq!(cache.history_count(&"k1"), None);
    }

    #[test]
    fn it_promotes_on_the_kth_get() {
        // given
        let cache = LruKCache::new(2, 10, 3);
        cache.put("k1", 1);
        assert_eq!(cache.history_count(&"k1"), Some(1));

        // when
        let second = cache.get(&"k1");
        let third = cache.get(&"k1");

        // then
        assert_eq!(second, None);
        assert_eq!(third, Some(1));
        assert!(cache.contains(&"k1"));
        assert_eq!(cache.history_count(&"k1"), None);
    }

    #[test]
    fn it_serves_promoted_keys_without_touching_the_history() {
        // given
        let cache = LruKCache::new(2, 10, 2);
        cache.put("k1", 1);
        cache.put("k1", 2);
        assert!(cache.contains(&"k1"));

        // when
        let value = cache.get(&"k1");

        // then
        assert_eq!(value, Some(2));
        assert_eq!(cache.history_count(&"k1"), None);
        assert_eq!(cache.check_invariants(), Ok(()));
    }

    #[test]
    fn it_promotes_on_the_kth_put() {
        // given
        let cache = LruKCache::new(2, 10, 2);
        cache.put("k1", 1);
        assert!(!cache.contains(&"k1"));

        // when
        cache.put("k1", 2);

        // then
        assert!(cache.contains(&"k1"));
        assert_eq!(cache.get(&"k1"), Some(2));
    }

    #[test]
    fn it_keeps_the_latest_pending_value() {
        // given
        let cache = LruKCache::new(2, 10, 3);
        cache.put("k1", 1);
        cache.put("k1", 2);

        // when
        let promoted = cache.get(&"k1");

        // then
        assert_eq!(promoted, Some(2));
    }

    #[test]
    fn it_keeps_scans_out_of_the_main_store() {
        // given
        let cache = LruKCache::new(2, 100, 2);
        cache.put(1, "hot");
        cache.put(1, "hot");
        cache.put(2, "warm");
        cache.get(&2);

        // when
        for key in 100..150 {
            cache.put(key, "scan");
        }

        // then
        assert_eq!(cache.get(&1), Some("hot"));
        assert_eq!(cache.get(&2), Some("warm"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn it_drops_pending_values_forgotten_by_the_history() {
        // given
        let cache = LruKCache::new(2, 1, 2);
        cache.put("k1", 1);

        // when
        cache.put("k2", 2);

        // then
        assert_eq!(cache.history_count(&"k1"), None);
        assert_eq!(cache.get(&"k1"), None);
        assert_eq!(cache.check_invariants(), Ok(()));
    }

    #[test]
    fn it_promotes_immediately_when_k_is_one() {
        // given
        let cache = LruKCache::new(1, 0, 1);

        // when
        cache.put("k1", 1);

        // then
        assert_eq!(cache.get(&"k1"), Some(1));
        assert_eq!(LruKCache::<u8, u8>::new(1, 0, 0).k(), 1);
    }

    #[test]
    fn it_removes_keys_from_every_tier() {
        // given
        let cache = LruKCache::new(2, 10, 2);
        cache.put("main", 1);
        cache.put("main", 1);
        cache.put("pending", 2);

        // when
        cache.remove(&"main");
        cache.remove(&"pending");

        // then
        assert!(!cache.contains(&"main"));
        assert_eq!(cache.history_count(&"pending"), None);
        assert_eq!(cache.get(&"pending"), None);
    }

    #[test]
    fn it_purges_every_tier() {
        // given
        let cache = LruKCache::new(2, 10, 2);
        cache.put("main", 1);
        cache.put("main", 1);
        cache.put("pending", 2);

        // when
        cache.purge();

        // then
        assert_eq!(cache.get(&"main"), None);
        assert_eq!(cache.history_count(&"pending"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn it_returns_default_for_misses() {
        // given
        let cache = LruKCache::new(2, 10, 1);
        cache.put("zero", 0);

        // then
        assert_eq!(cache.get_or_default(&"zero"), 0);
        assert_eq!(cache.get_or_default(&"missing"), 0);
        assert_eq!(cache.get(&"missing"), None);
    }
}
