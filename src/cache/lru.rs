use crate::cache::entry::Entry;
use crate::cache::recency_list::RecencyList;
use crate::cache::slot_arena::{SlotArena, SlotId};
use crate::cache::stats::{Counters, Stats};
use crate::cache::{CachePolicy, RandomState, RemovableCache, reserved_capacity};
use crate::error::InvariantError;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use tracing::trace;

/// Unsynchronized LRU state: a key index plus a recency list over one slot arena.
#[derive(Debug)]
pub(crate) struct LruCore<K, V, S = RandomState> {
    capacity: usize,
    index: HashMap<K, SlotId, S>,
    entries: SlotArena<Entry<K, V>>,
    order: RecencyList,
}

impl<K, V, S> LruCore<K, V, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let reserved = reserved_capacity(capacity);
        Self {
            capacity,
            index: HashMap::with_capacity_and_hasher(reserved, hash_builder),
            entries: SlotArena::with_capacity(reserved),
            order: RecencyList::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.order.clear();
    }
}

impl<K, V, S> LruCore<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    /// Inserts or updates `key` and marks it most recently used. Returns the entry that
    /// was evicted to make room, if any.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.value = value;
            }
            self.order.move_to_back(&mut self.entries, id);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        let id = self.entries.insert(Entry::new(key.clone(), value));
        self.order.push_back(&mut self.entries, id);
        self.index.insert(key, id);

        evicted
    }

    /// Returns the value of `key` and marks it most recently used.
    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = *self.index.get(key)?;
        self.order.move_to_back(&mut self.entries, id);
        self.entries.get(id).map(|entry| &entry.value)
    }

    /// Returns the value of `key` without touching its recency.
    pub(crate) fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.index.get(key)?;
        self.entries.get(*id).map(|entry| &entry.value)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.index.keys()
    }

    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index.contains_key(key)
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.index.remove(key)?;
        self.order.unlink(&mut self.entries, id);
        self.entries.remove(id).map(|entry| entry.value)
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let id = self.order.pop_front(&mut self.entries)?;
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        trace!(capacity = self.capacity, "evicted least recently used entry");
        Some((entry.key, entry.value))
    }

    pub(crate) fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() > self.capacity {
            return Err(InvariantError::OverCapacity {
                len: self.index.len(),
                capacity: self.capacity,
            });
        }
        if self.index.len() != self.entries.len() {
            return Err(InvariantError::LengthMismatch {
                indexed: self.index.len(),
                ordered: self.entries.len(),
            });
        }

        for id in self.order.check_links(&self.entries)? {
            let indexed = self
                .entries
                .get(id)
                .and_then(|entry| self.index.get(&entry.key));
            if indexed != Some(&id) {
                return Err(InvariantError::Unindexed { slot: id.index() });
            }
        }

        if self.order.len() != self.index.len() {
            return Err(InvariantError::LengthMismatch {
                indexed: self.index.len(),
                ordered: self.order.len(),
            });
        }

        Ok(())
    }
}

/// Thread-safe least-recently-used cache.
///
/// Every operation locks the cache once, so the key index and the recency list always
/// change together. Wrap the cache in a [`std::sync::Arc`] to share it between threads.
#[derive(Debug)]
pub struct LruCache<K, V, S = RandomState> {
    capacity: usize,
    core: Mutex<LruCore<K, V, S>>,
    counters: Counters,
}

impl<K, V> LruCache<K, V, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a cache holding at most `capacity` entries. A capacity of zero yields a
    /// cache that stores nothing.
    pub fn with_capacity(capacity: usize) -> LruCache<K, V, RandomState> {
        LruCache::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    /// Creates a cache holding at most `capacity` entries, using `hash_builder` to hash
    /// the keys.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> LruCache<K, V, S> {
        Self {
            capacity,
            core: Mutex::new(LruCore::with_capacity_and_hasher(capacity, hash_builder)),
            counters: Counters::default(),
        }
    }

    /// Inserts or updates a key-value pair and marks it most recently used.
    ///
    /// If the cache is full, the least recently used entry is evicted first.
    pub fn put(&self, key: K, value: V) {
        let evicted = self.core.lock().put(key, value);
        if evicted.is_some() {
            self.counters.increment_eviction_count();
        }
    }

    /// Returns a clone of the value corresponding to the key and marks it most recently
    /// used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let value = self.core.lock().get(key).cloned();
        self.counters.record_lookup(value.is_some());
        value
    }

    /// Returns the value corresponding to the key or `V::default()` on a miss.
    ///
    /// A miss cannot be told apart from a hit on a default value; use [`LruCache::get`]
    /// when that matters.
    pub fn get_or_default<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Returns whether the key is cached without touching its recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.lock().contains(key)
    }

    /// Removes the key, returning its value if it was cached.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.lock().remove(key)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.core.lock().check_invariants()
    }
}

impl<K, V, S> LruCache<K, V, S> {
    /// Removes every entry.
    pub fn purge(&self) {
        self.core.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }
}

impl<K, V, S> CachePolicy<K, V> for LruCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn put(&self, key: K, value: V) {
        LruCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        LruCache::get(self, key)
    }

    fn purge(&self) {
        LruCache::purge(self)
    }

    fn len(&self) -> usize {
        LruCache::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn stats(&self) -> Stats {
        LruCache::stats(self)
    }

    fn reset_stats(&self) {
        LruCache::reset_stats(self)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        LruCache::check_invariants(self)
    }
}

impl<K, V, S> RemovableCache<K, V> for LruCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn remove(&self, key: &K) {
        LruCache::remove(self, key);
    }
}
