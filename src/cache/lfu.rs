use crate::cache::entry::{Counted, LfuEntry};
use crate::cache::frequency_buckets::FrequencyBuckets;
use crate::cache::slot_arena::{SlotArena, SlotId};
use crate::cache::stats::{Counters, Stats};
use crate::cache::{CachePolicy, RandomState, reserved_capacity};
use crate::config::LfuConfig;
use crate::error::InvariantError;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use tracing::{debug, trace};

#[derive(Debug)]
struct LfuCore<K, V, S> {
    capacity: usize,
    max_average_num: u64,
    index: HashMap<K, SlotId, S>,
    entries: SlotArena<LfuEntry<K, V>>,
    buckets: FrequencyBuckets,
    // Inserts and accesses since the last purge, less the frequencies of evicted
    // entries. Aging lowers frequencies but leaves this total alone.
    total_access_count: u64,
    average_access_count: u64,
}

impl<K, V, S> LfuCore<K, V, S> {
    fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.buckets.clear();
        self.total_access_count = 0;
        self.average_access_count = 0;
    }

    fn update_average(&mut self) {
        self.average_access_count = match self.index.len() as u64 {
            0 => 0,
            len => self.total_access_count / len,
        };
    }

    fn record_access(&mut self) {
        self.total_access_count += 1;
        self.update_average();
        if self.average_access_count > self.max_average_num {
            self.age();
        }
    }

    fn age(&mut self) {
        let decay = self.max_average_num / 2;
        if decay == 0 {
            return;
        }
        self.buckets.decay(&mut self.entries, decay);
        debug!(
            entries = self.index.len(),
            decay,
            average_access_count = self.average_access_count,
            min_frequency = ?self.buckets.min_frequency(),
            "aged entry frequencies"
        );
    }

    fn touch(&mut self, id: SlotId) {
        self.buckets.touch(&mut self.entries, id);
        self.record_access();
    }
}

impl<K, V, S> LfuCore<K, V, S>
where
    K: Clone + Eq + Hash,
    S: BuildHasher,
{
    fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.value = value;
            }
            self.touch(id);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        let id = self.entries.insert(LfuEntry::new(key.clone(), value));
        self.index.insert(key, id);
        self.buckets.insert(&mut self.entries, id);
        self.record_access();

        evicted
    }

    fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = *self.index.get(key)?;
        self.touch(id);
        self.entries.get(id).map(|entry| &entry.value)
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let id = self.buckets.pop_min(&mut self.entries)?;
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        self.total_access_count = self.total_access_count.saturating_sub(entry.frequency());
        self.update_average();
        trace!(
            frequency = entry.frequency(),
            "evicted least frequently used entry"
        );
        Some((entry.key, entry.value))
    }

    fn frequency<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.index.get(key)?;
        self.entries.get(*id).map(Counted::frequency)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() > self.capacity {
            return Err(InvariantError::OverCapacity {
                len: self.index.len(),
                capacity: self.capacity,
            });
        }

        let filed = self.buckets.check_invariants(&self.entries)?;
        if filed != self.index.len() || self.entries.len() != self.index.len() {
            return Err(InvariantError::LengthMismatch {
                indexed: self.index.len(),
                ordered: filed,
            });
        }

        for (id, entry) in self.entries.iter() {
            if self.index.get(&entry.key) != Some(&id) {
                return Err(InvariantError::Unindexed { slot: id.index() });
            }
        }

        let actual: u64 = self.entries.iter().map(|(_, entry)| entry.frequency()).sum();
        if actual > self.total_access_count {
            return Err(InvariantError::AccessCountDrift {
                tracked: self.total_access_count,
                actual,
            });
        }

        Ok(())
    }
}

/// Thread-safe least-frequently-used cache with frequency aging.
///
/// Each entry starts at frequency one and gains one per access. The cache evicts the
/// entry with the lowest frequency, and among equal frequencies the one that reached it
/// first.
///
/// The cache also keeps a running total of inserts and accesses, lowered only by the
/// frequencies of evicted entries. Whenever that total divided by the number of entries
/// exceeds [`LfuConfig::max_average_num`], every frequency is lowered by half that
/// threshold (but never below one), which lets formerly hot entries become evictable
/// again. Aging does not lower the total, so it repeats on each access until evictions
/// bring the average back down.
#[derive(Debug)]
pub struct LfuCache<K, V, S = RandomState> {
    capacity: usize,
    core: Mutex<LfuCore<K, V, S>>,
    counters: Counters,
}

impl<K, V> LfuCache<K, V, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a cache holding at most `capacity` entries with aging effectively disabled.
    pub fn with_capacity(capacity: usize) -> LfuCache<K, V, RandomState> {
        LfuCache::with_config(LfuConfig::new(capacity))
    }

    pub fn with_config(config: LfuConfig) -> LfuCache<K, V, RandomState> {
        LfuCache::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V, S> LfuCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    pub fn with_config_and_hasher(config: LfuConfig, hash_builder: S) -> LfuCache<K, V, S> {
        let reserved = reserved_capacity(config.capacity);
        let core = LfuCore {
            capacity: config.capacity,
            max_average_num: config.max_average_num,
            index: HashMap::with_capacity_and_hasher(reserved, hash_builder),
            entries: SlotArena::with_capacity(reserved),
            buckets: FrequencyBuckets::new(),
            total_access_count: 0,
            average_access_count: 0,
        };

        Self {
            capacity: config.capacity,
            core: Mutex::new(core),
            counters: Counters::default(),
        }
    }

    /// Inserts a new key at frequency one, or updates an existing key and counts the
    /// update as an access.
    pub fn put(&self, key: K, value: V) {
        let evicted = self.core.lock().put(key, value);
        if evicted.is_some() {
            self.counters.increment_eviction_count();
        }
    }

    /// Returns a clone of the value corresponding to the key and counts the access.
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
    pub fn get_or_default<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Current access frequency of the key, without counting an access.
    pub fn frequency<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.lock().frequency(key)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.core.lock().check_invariants()
    }
}

impl<K, V, S> LfuCache<K, V, S> {
    /// Removes every entry and resets the access counts.
    pub fn purge(&self) {
        self.core.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.core.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_average_num(&self) -> u64 {
        self.core.lock().max_average_num
    }

    /// Running access total divided by the number of entries, rounded down.
    pub fn average_access_count(&self) -> u64 {
        self.core.lock().average_access_count
    }

    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }
}

impl<K, V, S> CachePolicy<K, V> for LfuCache<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    fn put(&self, key: K, value: V) {
        LfuCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        LfuCache::get(self, key)
    }

    fn purge(&self) {
        LfuCache::purge(self)
    }

    fn len(&self) -> usize {
        LfuCache::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn stats(&self) -> Stats {
        LfuCache::stats(self)
    }

    fn reset_stats(&self) {
        LfuCache::reset_stats(self)
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        LfuCache::check_invariants(self)
    }
}
