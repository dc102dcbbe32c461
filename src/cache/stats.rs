use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hit, miss and eviction counts of a cache since it was created or last reset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Stats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

impl Stats {
    /// Fraction of lookups that were hits, `0.0` when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hit_count + self.miss_count;
        if lookups == 0 {
            return 0.0;
        }
        self.hit_count as f64 / lookups as f64
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, rhs: Self) -> Self::Output {
        Stats {
            hit_count: self.hit_count + rhs.hit_count,
            miss_count: self.miss_count + rhs.miss_count,
            eviction_count: self.eviction_count + rhs.eviction_count,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            hit_count: self.hit_count.load(Ordering::Acquire),
            miss_count: self.miss_count.load(Ordering::Acquire),
            eviction_count: self.eviction_count.load(Ordering::Acquire),
        }
    }

    pub(crate) fn record_lookup(&self, hit: bool) {
        if hit {
            self.hit_count.fetch_add(1, Ordering::AcqRel);
        } else {
            self.miss_count.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn increment_eviction_count(&self) {
        self.eviction_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn reset(&self) {
        self.hit_count.store(0, Ordering::Release);
        self.miss_count.store(0, Ordering::Release);
        self.eviction_count.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_computes_hit_rate() {
        // given
        let stats = Stats {
            hit_count: 3,
            miss_count: 1,
            eviction_count: 0,
        };

        // then
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(Stats::default().hit_rate(), 0.0);
    }

    #[test]
    fn it_counts_and_resets() {
        // given
        let counters = Counters::default();

        // when
        counters.record_lookup(true);
        counters.record_lookup(false);
        counters.record_lookup(false);
        counters.increment_eviction_count();

        // then
        let stats = counters.snapshot();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 2);
        assert_eq!(stats.eviction_count, 1);

        counters.reset();
        assert_eq!(counters.snapshot(), Stats::default());
    }
}
