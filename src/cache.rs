use crate::Stats;
use crate::config::{LfuConfig, ShardCount};
use crate::error::InvariantError;
use lfu::LfuCache;
use lru::LruCache;
use std::hash::{BuildHasher, Hash};
use tracing::debug;

mod entry;
mod frequency_buckets;
pub(crate) mod lfu;
pub(crate) mod lru;
pub(crate) mod lru_k;
mod recency_list;
mod slot_arena;
pub(crate) mod stats;

pub(crate) type RandomState = ahash::RandomState;

// Upper bound on the entries reserved up front, so huge capacities allocate lazily.
const MAX_RESERVED_ENTRIES: usize = 1 << 16;

pub(crate) fn reserved_capacity(capacity: usize) -> usize {
    capacity.min(MAX_RESERVED_ENTRIES)
}

/// The operations shared by every eviction policy.
///
/// All methods take `&self`: implementations synchronize internally, so a policy can be
/// shared between threads and used behind a `dyn CachePolicy<K, V>`.
pub trait CachePolicy<K, V> {
    /// Inserts or updates a key-value pair. Does nothing if the capacity is zero.
    fn put(&self, key: K, value: V);

    /// Returns a clone of the value corresponding to the key, or [`None`] on a miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Returns the value corresponding to the key or `V::default()` on a miss.
    ///
    /// A miss is indistinguishable from a hit on a default value; use
    /// [`CachePolicy::get`] when the difference matters.
    fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    /// Removes every entry together with any auxiliary state.
    fn purge(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn stats(&self) -> Stats;

    fn reset_stats(&self);

    /// Verifies that the key index and the ordering structures agree.
    fn check_invariants(&self) -> Result<(), InvariantError>;
}

/// Policies that support removing a single key.
pub trait RemovableCache<K, V>: CachePolicy<K, V> {
    /// Removes the key if present.
    fn remove(&self, key: &K);
}

/// Partitions the key space across independently locked caches.
///
/// A key always hashes to the same shard, and each operation locks only that shard, so
/// threads working on different shards never contend. There is no coordination between
/// shards: eviction decisions are local to each shard.
#[derive(Debug)]
pub struct ShardedCache<C, S = RandomState> {
    hash_builder: S,
    shards: Vec<C>,
}

/// Sharded [`LruCache`].
pub type ShardedLruCache<K, V> = ShardedCache<LruCache<K, V>>;

/// Sharded [`LfuCache`].
pub type ShardedLfuCache<K, V> = ShardedCache<LfuCache<K, V>>;

impl<K, V> ShardedCache<LruCache<K, V>, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a sharded LRU cache holding at least `capacity` entries in total.
    ///
    /// Each shard holds `capacity / shard_count` entries, rounded up. A `shard_count` of
    /// zero creates one shard per available CPU.
    pub fn lru(capacity: usize, shard_count: usize) -> Self {
        ShardedCache::with_shards(
            capacity,
            ShardCount::from(shard_count),
            RandomState::new(),
            LruCache::with_capacity,
        )
    }
}

impl<K, V> ShardedCache<LfuCache<K, V>, RandomState>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Creates a sharded LFU cache holding at least `capacity` entries in total. Every
    /// shard ages its own frequencies against `max_average_num`.
    pub fn lfu(capacity: usize, shard_count: usize, max_average_num: u64) -> Self {
        ShardedCache::with_shards(
            capacity,
            ShardCount::from(shard_count),
            RandomState::new(),
            |shard_capacity| {
                LfuCache::with_config(
                    LfuConfig::new(shard_capacity).with_max_average_num(max_average_num),
                )
            },
        )
    }
}

impl<C, S> ShardedCache<C, S>
where
    S: BuildHasher,
{
    /// Creates a sharded cache whose shards are built by `make_shard` from the per-shard
    /// capacity. `hash_builder` selects the shard of a key.
    pub fn with_shards<F>(
        capacity: usize,
        shard_count: ShardCount,
        hash_builder: S,
        make_shard: F,
    ) -> ShardedCache<C, S>
    where
        F: FnMut(usize) -> C,
    {
        let number_of_shards = shard_count.resolve().max(1);
        let capacity_per_shard = capacity.div_ceil(number_of_shards);

        let shards: Vec<C> = std::iter::repeat_n(capacity_per_shard, number_of_shards)
            .map(make_shard)
            .collect();

        debug!(
            shards = number_of_shards,
            capacity_per_shard, "created sharded cache"
        );

        Self {
            hash_builder,
            shards,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard responsible for `key`.
    pub fn shard_index<Q>(&self, key: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        let hash = self.hash_builder.hash_one(key);
        (hash % self.shards.len() as u64) as usize
    }

    fn shard<Q>(&self, key: &Q) -> &C
    where
        Q: ?Sized + Hash,
    {
        &self.shards[self.shard_index(key)]
    }
}

impl<K, V, C, S> CachePolicy<K, V> for ShardedCache<C, S>
where
    K: Hash,
    C: CachePolicy<K, V>,
    S: BuildHasher,
{
    fn put(&self, key: K, value: V) {
        self.shard(&key).put(key, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.shard(key).get(key)
    }

    fn purge(&self) {
        for shard in &self.shards {
            shard.purge();
        }
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    fn capacity(&self) -> usize {
        self.shards.iter().map(|shard| shard.capacity()).sum()
    }

    fn stats(&self) -> Stats {
        self.shards
            .iter()
            .map(|shard| shard.stats())
            .fold(Stats::default(), |total, stats| total + stats)
    }

    fn reset_stats(&self) {
        for shard in &self.shards {
            shard.reset_stats();
        }
    }

    fn check_invariants(&self) -> Result<(), InvariantError> {
        self.shards
            .iter()
            .try_for_each(|shard| shard.check_invariants())
    }
}

impl<K, V, C, S> RemovableCache<K, V> for ShardedCache<C, S>
where
    K: Hash,
    C: RemovableCache<K, V>,
    S: BuildHasher,
{
    fn remove(&self, key: &K) {
        self.shard(key).remove(key)
    }
}
