//! Construction-time configuration for the caches in this crate.

use std::num::NonZero;
use std::thread;

/// Aging threshold used when an LFU cache is built without one. Large enough that aging
/// effectively never triggers.
pub const DEFAULT_MAX_AVERAGE_NUM: u64 = 1_000_000;

/// Number of shards of a [`ShardedCache`](crate::ShardedCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShardCount {
    /// One shard per unit of available hardware parallelism.
    #[default]
    Auto,
    Fixed(NonZero<usize>),
}

impl ShardCount {
    /// Resolves the shard count, querying the runtime environment for [`ShardCount::Auto`].
    pub fn resolve(self) -> usize {
        match self {
            ShardCount::Auto => thread::available_parallelism()
                .map(NonZero::get)
                .unwrap_or(1),
            ShardCount::Fixed(count) => count.get(),
        }
    }
}

/// `0` selects [`ShardCount::Auto`].
impl From<usize> for ShardCount {
    fn from(count: usize) -> Self {
        NonZero::new(count).map_or(ShardCount::Auto, ShardCount::Fixed)
    }
}

/// Configuration of an [`LfuCache`](crate::LfuCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfuConfig {
    pub capacity: usize,
    /// Aging runs whenever the average access count per entry exceeds this value.
    pub max_average_num: u64,
}

impl LfuConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            max_average_num: DEFAULT_MAX_AVERAGE_NUM,
        }
    }

    pub fn with_max_average_num(mut self, max_average_num: u64) -> Self {
        self.max_average_num = max_average_num;
        self
    }
}

/// Configuration of an [`LruKCache`](crate::LruKCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LruKConfig {
    /// Entries held by the main store.
    pub capacity: usize,
    /// Keys whose accesses are tracked while they wait for promotion.
    pub history_capacity: usize,
    /// Accesses needed before a key is admitted into the main store. `0` behaves as `1`.
    pub k: usize,
}

impl LruKConfig {
    pub fn new(capacity: usize, history_capacity: usize, k: usize) -> Self {
        Self {
            capacity,
            history_capacity,
            k,
        }
    }
}
